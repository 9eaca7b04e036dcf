//! Recent-record summary for `/view_records`

use crate::ledger::{FuelRecord, UsageRecord};
use chrono::NaiveDateTime;
use std::fmt::Write;

pub const USAGE_HEADER: &str = "Usage Records";
pub const FUEL_HEADER: &str = "Fuel Records";

/// Render recent usage and fuel records (already sorted newest first)
pub fn render_recent(usage: &[UsageRecord], fuel: &[FuelRecord]) -> String {
    let mut out = String::from(USAGE_HEADER);
    for record in usage {
        let _ = write!(
            out,
            "\nDate: {} - Users: {} - Miles: {}",
            display_date(&record.date),
            record.participants.join(", "),
            record.miles
        );
    }

    out.push_str("\n\n");
    out.push_str(FUEL_HEADER);
    for record in fuel {
        let _ = write!(
            out,
            "\nDate: {} - User: {} - Price: {:.2}",
            display_date(&record.date),
            record.payer,
            record.cost
        );
    }
    out
}

fn display_date(date: &NaiveDateTime) -> String {
    date.format("%Y-%m-%d %H:%M").to_string()
}
