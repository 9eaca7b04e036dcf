//! Ledger store
//!
//! Persists usage and fuel records and answers the time-range queries the
//! intake flows and the cost allocation need.

mod schema;

pub use schema::*;

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corrupt participants column: {0}")]
    Participants(#[from] serde_json::Error),
    #[error("Corrupt date value: {0}")]
    Date(String),
}

pub type DbResult<T> = Result<T, DbError>;

const USAGE_COLUMNS: &str = "participants, date, miles, odometer, toll, title";
const FUEL_COLUMNS: &str = "payer, date, cost";

/// Thread-safe ledger handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the ledger at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory ledger (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Usage Operations ====================

    /// Append a usage record, returning its row id
    pub fn insert_usage(&self, record: &UsageRecord) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        let participants = serde_json::to_string(&record.participants)?;

        conn.execute(
            "INSERT INTO usage (participants, date, miles, odometer, toll, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                participants,
                format_date(&record.date),
                record.miles,
                record.odometer,
                record.toll,
                record.title,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Among usage records dated before `before`, the one with the highest
    /// odometer reading
    pub fn latest_usage_before(&self, before: &NaiveDateTime) -> DbResult<Option<UsageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USAGE_COLUMNS} FROM usage WHERE date < ?1
             ORDER BY odometer DESC, date DESC LIMIT 1"
        ))?;

        let row = stmt
            .query_row(params![format_date(before)], read_usage_row)
            .optional()?;
        row.map(UsageRow::into_record).transpose()
    }

    /// Usage records strictly inside `(after, before)`; `after = None` means
    /// the window is open at the start
    pub fn usage_between(
        &self,
        after: Option<&NaiveDateTime>,
        before: &NaiveDateTime,
    ) -> DbResult<Vec<UsageRecord>> {
        let conn = self.conn.lock().unwrap();
        let rows = if let Some(after) = after {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USAGE_COLUMNS} FROM usage WHERE date > ?1 AND date < ?2 ORDER BY date ASC"
            ))?;
            let rows = stmt
                .query_map(params![format_date(after), format_date(before)], read_usage_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USAGE_COLUMNS} FROM usage WHERE date < ?1 ORDER BY date ASC"
            ))?;
            let rows = stmt
                .query_map(params![format_date(before)], read_usage_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(UsageRow::into_record).collect()
    }

    /// The `limit` most recently dated usage records, newest first
    pub fn recent_usage(&self, limit: usize) -> DbResult<Vec<UsageRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USAGE_COLUMNS} FROM usage ORDER BY date DESC LIMIT ?1"
        ))?;

        let rows = stmt
            .query_map(params![clamp_limit(limit)], read_usage_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(UsageRow::into_record).collect()
    }

    // ==================== Fuel Operations ====================

    /// Append a fuel record, returning its row id
    pub fn insert_fuel(&self, record: &FuelRecord) -> DbResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO fuel (payer, date, cost, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.payer,
                format_date(&record.date),
                record.cost,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The latest fuel record dated strictly before `before`
    pub fn previous_fuel_before(&self, before: &NaiveDateTime) -> DbResult<Option<FuelRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FUEL_COLUMNS} FROM fuel WHERE date < ?1 ORDER BY date DESC LIMIT 1"
        ))?;

        let row = stmt
            .query_row(params![format_date(before)], read_fuel_row)
            .optional()?;
        row.map(FuelRow::into_record).transpose()
    }

    /// The `limit` most recently dated fuel records, newest first
    pub fn recent_fuel(&self, limit: usize) -> DbResult<Vec<FuelRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FUEL_COLUMNS} FROM fuel ORDER BY date DESC LIMIT ?1"
        ))?;

        let rows = stmt
            .query_map(params![clamp_limit(limit)], read_fuel_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(FuelRow::into_record).collect()
    }
}

// Rows are read raw and decoded outside the rusqlite callback.

struct UsageRow {
    participants: String,
    date: String,
    miles: i64,
    odometer: i64,
    toll: f64,
    title: String,
}

impl UsageRow {
    fn into_record(self) -> DbResult<UsageRecord> {
        Ok(UsageRecord {
            participants: serde_json::from_str(&self.participants)?,
            date: parse_date(&self.date).ok_or(DbError::Date(self.date))?,
            miles: self.miles,
            odometer: self.odometer,
            toll: self.toll,
            title: self.title,
        })
    }
}

struct FuelRow {
    payer: String,
    date: String,
    cost: f64,
}

impl FuelRow {
    fn into_record(self) -> DbResult<FuelRecord> {
        Ok(FuelRecord {
            payer: self.payer,
            date: parse_date(&self.date).ok_or(DbError::Date(self.date))?,
            cost: self.cost,
        })
    }
}

fn read_usage_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UsageRow> {
    Ok(UsageRow {
        participants: row.get(0)?,
        date: row.get(1)?,
        miles: row.get(2)?,
        odometer: row.get(3)?,
        toll: row.get(4)?,
        title: row.get(5)?,
    })
}

fn read_fuel_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FuelRow> {
    Ok(FuelRow {
        payer: row.get(0)?,
        date: row.get(1)?,
        cost: row.get(2)?,
    })
}

fn clamp_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
