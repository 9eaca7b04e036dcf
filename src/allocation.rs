//! Fuel cost allocation
//!
//! Splits a fuel purchase across the participants who drove since the
//! previous purchase, proportionally to their mileage, and adds back any
//! tolls they paid on those trips. Pure: the caller fetches the records.

use crate::ledger::{FuelRecord, UsageRecord};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt::Write;


/// Open time interval whose usage records are billed against one fuel purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationWindow {
    /// Date of the previous fuel purchase; `None` when this is the first one
    pub after: Option<NaiveDateTime>,
    pub before: NaiveDateTime,
}

impl AllocationWindow {
    pub fn for_fuel(fuel: &FuelRecord, previous: Option<&FuelRecord>) -> Self {
        Self {
            after: previous.map(|p| p.date),
            before: fuel.date,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        *date < self.before && self.after.map_or(true, |after| *date > after)
    }
}

/// One participant's portion of a fuel purchase
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Share {
    /// Miles attributed to the participant within the window
    pub miles: f64,
    /// Portion of the fuel cost attributed by mileage
    pub fuel: f64,
    /// Tolls reimbursed to the participant
    pub toll: f64,
}

impl Share {
    pub fn owed(&self) -> f64 {
        self.fuel + self.toll
    }
}

/// Result of allocating one fuel purchase
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    pub cost: f64,
    pub total_miles: f64,
    pub shares: BTreeMap<String, Share>,
}

impl Allocation {
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    #[allow(dead_code)] // Used in tests
    pub fn owed(&self, participant: &str) -> Option<f64> {
        self.shares.get(participant).map(Share::owed)
    }

    /// Sum of the mileage-based portions, which equals `cost` whenever any
    /// mileage was driven
    pub fn fuel_total(&self) -> f64 {
        self.shares.values().map(|s| s.fuel).sum()
    }
}

/// Allocate `cost` over `usage`.
///
/// Each record's miles and toll are split evenly across its participant
/// list (a name listed twice takes two slots). Records with no participants
/// contribute nothing. When the window holds no mileage at all the fuel
/// cost is left unattributed and only tolls are returned.
#[allow(clippy::cast_precision_loss)]
pub fn allocate(cost: f64, usage: &[UsageRecord]) -> Allocation {
    let mut shares: BTreeMap<String, Share> = BTreeMap::new();

    for record in usage {
        if record.participants.is_empty() {
            tracing::warn!(date = %record.date, title = %record.title, "Usage record has no participants, skipping");
            continue;
        }
        let slots = record.participants.len() as f64;
        let miles_each = record.miles as f64 / slots;
        let toll_each = record.toll / slots;

        for name in &record.participants {
            let share = shares.entry(name.clone()).or_default();
            share.miles += miles_each;
            share.toll += toll_each;
        }
    }

    let total_miles: f64 = shares.values().map(|s| s.miles).sum();
    if total_miles > 0.0 {
        for share in shares.values_mut() {
            share.fuel = cost * share.miles / total_miles;
        }
    } else if !shares.is_empty() {
        tracing::warn!(cost, "No mileage in allocation window, fuel cost left unattributed");
    }

    Allocation {
        cost,
        total_miles,
        shares,
    }
}

/// Render the allocation as `name: $amount` lines
pub fn render_allocation(allocation: &Allocation) -> String {
    if allocation.is_empty() {
        return "No usage was recorded since the previous fuel purchase.".to_string();
    }

    let mut out = String::new();
    for (name, share) in &allocation.shares {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "{name}: ${:.2}", share.owed());
    }
    out
}
