//! Intake session state types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const OTHERS_OPTION: &str = "Others";
pub const DONE_OPTION: &str = "Done";
pub const NOW_OPTION: &str = "Now";

// ============================================================================
// Choice Menus
// ============================================================================

/// Quick-reply options rendered by the transport.
///
/// Replies are never checked against the menu; any free text is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub rows: Vec<Vec<String>>,
}

impl Menu {
    /// Roster plus "Others" and "Done", for picking trip participants
    pub fn participants(roster: &[String]) -> Self {
        let mut row = roster.to_vec();
        row.push(OTHERS_OPTION.to_string());
        row.push(DONE_OPTION.to_string());
        Self { rows: vec![row] }
    }

    /// Roster only, for picking the single payer of a fuel purchase
    pub fn payers(roster: &[String]) -> Self {
        Self {
            rows: vec![roster.to_vec()],
        }
    }

    pub fn date() -> Self {
        Self {
            rows: vec![vec![NOW_OPTION.to_string()]],
        }
    }
}

// ============================================================================
// Intake State
// ============================================================================

/// Which record an intake session is building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Usage,
    Fuel,
}

/// Per-conversation intake state.
///
/// Each non-idle variant carries exactly the fields collected so far, so a
/// step can only be reached once its inputs exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeState {
    /// No flow in progress
    #[default]
    Idle,

    // Usage flow
    /// Picking participants from the roster; "Others" and "Done" are special
    CollectingParticipants { participants: Vec<String> },

    /// Waiting for one free-text participant name
    AddingCustomParticipant { participants: Vec<String> },

    CollectingUsageDate { participants: Vec<String> },

    CollectingOdometer {
        participants: Vec<String>,
        date: NaiveDateTime,
    },

    /// Odometer accepted, waiting for the previous reading from the ledger
    ResolvingMileage {
        participants: Vec<String>,
        date: NaiveDateTime,
        odometer: i64,
    },

    CollectingToll {
        participants: Vec<String>,
        date: NaiveDateTime,
        odometer: i64,
        miles: i64,
    },

    CollectingTitle {
        participants: Vec<String>,
        date: NaiveDateTime,
        odometer: i64,
        miles: i64,
        toll: f64,
    },

    // Fuel flow
    CollectingPayer,

    CollectingFuelDate { payer: String },

    CollectingCost { payer: String, date: NaiveDateTime },
}

impl IntakeState {
    pub fn is_idle(&self) -> bool {
        matches!(self, IntakeState::Idle)
    }

    pub fn flow(&self) -> Option<Flow> {
        match self {
            IntakeState::Idle => None,
            IntakeState::CollectingParticipants { .. }
            | IntakeState::AddingCustomParticipant { .. }
            | IntakeState::CollectingUsageDate { .. }
            | IntakeState::CollectingOdometer { .. }
            | IntakeState::ResolvingMileage { .. }
            | IntakeState::CollectingToll { .. }
            | IntakeState::CollectingTitle { .. } => Some(Flow::Usage),
            IntakeState::CollectingPayer
            | IntakeState::CollectingFuelDate { .. }
            | IntakeState::CollectingCost { .. } => Some(Flow::Fuel),
        }
    }

    /// Participants accumulated so far in the usage flow
    #[allow(dead_code)] // Used in tests
    pub fn participants(&self) -> &[String] {
        match self {
            IntakeState::CollectingParticipants { participants }
            | IntakeState::AddingCustomParticipant { participants }
            | IntakeState::CollectingUsageDate { participants }
            | IntakeState::CollectingOdometer { participants, .. }
            | IntakeState::ResolvingMileage { participants, .. }
            | IntakeState::CollectingToll { participants, .. }
            | IntakeState::CollectingTitle { participants, .. } => participants,
            _ => &[],
        }
    }

    /// Short name of the current step, for logs
    pub fn step_name(&self) -> &'static str {
        match self {
            IntakeState::Idle => "idle",
            IntakeState::CollectingParticipants { .. } => "collect_participants",
            IntakeState::AddingCustomParticipant { .. } => "add_custom_participant",
            IntakeState::CollectingUsageDate { .. } | IntakeState::CollectingFuelDate { .. } => {
                "collect_date"
            }
            IntakeState::CollectingOdometer { .. } => "collect_odometer",
            IntakeState::ResolvingMileage { .. } => "resolve_mileage",
            IntakeState::CollectingToll { .. } => "collect_toll",
            IntakeState::CollectingTitle { .. } => "collect_title",
            IntakeState::CollectingPayer => "collect_payer",
            IntakeState::CollectingCost { .. } => "collect_cost",
        }
    }
}

/// Immutable configuration for an intake session
#[derive(Debug, Clone)]
pub struct IntakeContext {
    pub conversation_id: String,
    /// Known participant names offered as quick-select options
    pub roster: Vec<String>,
    /// Lowest odometer reading accepted as a dashboard value
    pub odometer_floor: i64,
}

/// Default lower bound for a plausible odometer reading
pub const DEFAULT_ODOMETER_FLOOR: i64 = 1000;

impl IntakeContext {
    pub fn new(conversation_id: impl Into<String>, roster: Vec<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            roster,
            odometer_floor: DEFAULT_ODOMETER_FLOOR,
        }
    }

    pub fn with_odometer_floor(mut self, floor: i64) -> Self {
        self.odometer_floor = floor;
        self
    }
}
