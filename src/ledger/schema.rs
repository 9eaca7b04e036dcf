//! Ledger schema and record types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS usage (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    participants TEXT NOT NULL,
    date TEXT NOT NULL,
    miles INTEGER NOT NULL,
    odometer INTEGER NOT NULL,
    toll REAL NOT NULL DEFAULT 0,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_date ON usage(date DESC);

CREATE TABLE IF NOT EXISTS fuel (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payer TEXT NOT NULL,
    date TEXT NOT NULL,
    cost REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fuel_date ON fuel(date DESC);
";

/// Storage format for record dates.
///
/// Fixed width with microseconds so that lexical order in SQLite matches
/// chronological order.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One trip log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub participants: Vec<String>,
    pub date: NaiveDateTime,
    /// Distance since the previous odometer reading
    pub miles: i64,
    /// Raw dashboard reading
    pub odometer: i64,
    pub toll: f64,
    pub title: String,
}

/// One fuel purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelRecord {
    pub payer: String,
    pub date: NaiveDateTime,
    pub cost: f64,
}

pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()
}
