//! Effects produced by state transitions

use super::state::Menu;
use crate::ledger::{FuelRecord, UsageRecord};
use chrono::NaiveDateTime;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver a text message, optionally with quick-reply options
    Reply { text: String, menu: Option<Menu> },

    /// Look up the highest odometer reading dated before `before`
    /// (answered with `Event::PreviousOdometer`)
    LookupPreviousOdometer { before: NaiveDateTime },

    /// Append a finished usage record to the ledger
    PersistUsage { record: UsageRecord },

    /// Append a finished fuel record to the ledger
    PersistFuel { record: FuelRecord },

    /// Compute and deliver each participant's share of a fuel purchase
    AllocateFuel { record: FuelRecord },

    /// Deliver the recent-records summary
    ShowRecentRecords,
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply {
            text: text.into(),
            menu: None,
        }
    }

    pub fn reply_with_menu(text: impl Into<String>, menu: Menu) -> Self {
        Effect::Reply {
            text: text.into(),
            menu: Some(menu),
        }
    }
}
