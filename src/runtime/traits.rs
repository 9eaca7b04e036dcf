//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::ledger::{Database, FuelRecord, UsageRecord};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Append-only store of usage and fuel records
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_usage(&self, record: &UsageRecord) -> Result<(), String>;

    async fn insert_fuel(&self, record: &FuelRecord) -> Result<(), String>;

    /// Highest odometer reading among usage records dated before `before`
    async fn latest_odometer_before(&self, before: &NaiveDateTime) -> Result<Option<i64>, String>;

    /// Latest fuel record dated strictly before `before`
    async fn previous_fuel_before(
        &self,
        before: &NaiveDateTime,
    ) -> Result<Option<FuelRecord>, String>;

    /// Usage records strictly inside `(after, before)`
    async fn usage_between(
        &self,
        after: Option<&NaiveDateTime>,
        before: &NaiveDateTime,
    ) -> Result<Vec<UsageRecord>, String>;

    async fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>, String>;

    async fn recent_fuel(&self, limit: usize) -> Result<Vec<FuelRecord>, String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    async fn insert_usage(&self, record: &UsageRecord) -> Result<(), String> {
        (**self).insert_usage(record).await
    }

    async fn insert_fuel(&self, record: &FuelRecord) -> Result<(), String> {
        (**self).insert_fuel(record).await
    }

    async fn latest_odometer_before(&self, before: &NaiveDateTime) -> Result<Option<i64>, String> {
        (**self).latest_odometer_before(before).await
    }

    async fn previous_fuel_before(
        &self,
        before: &NaiveDateTime,
    ) -> Result<Option<FuelRecord>, String> {
        (**self).previous_fuel_before(before).await
    }

    async fn usage_between(
        &self,
        after: Option<&NaiveDateTime>,
        before: &NaiveDateTime,
    ) -> Result<Vec<UsageRecord>, String> {
        (**self).usage_between(after, before).await
    }

    async fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>, String> {
        (**self).recent_usage(limit).await
    }

    async fn recent_fuel(&self, limit: usize) -> Result<Vec<FuelRecord>, String> {
        (**self).recent_fuel(limit).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `LedgerStore`
#[derive(Clone)]
pub struct DatabaseLedger {
    db: Database,
}

impl DatabaseLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for DatabaseLedger {
    async fn insert_usage(&self, record: &UsageRecord) -> Result<(), String> {
        let id = self.db.insert_usage(record).map_err(|e| e.to_string())?;
        tracing::debug!(id, miles = record.miles, "Usage record stored");
        Ok(())
    }

    async fn insert_fuel(&self, record: &FuelRecord) -> Result<(), String> {
        let id = self.db.insert_fuel(record).map_err(|e| e.to_string())?;
        tracing::debug!(id, cost = record.cost, "Fuel record stored");
        Ok(())
    }

    async fn latest_odometer_before(&self, before: &NaiveDateTime) -> Result<Option<i64>, String> {
        self.db
            .latest_usage_before(before)
            .map(|record| record.map(|r| r.odometer))
            .map_err(|e| e.to_string())
    }

    async fn previous_fuel_before(
        &self,
        before: &NaiveDateTime,
    ) -> Result<Option<FuelRecord>, String> {
        self.db
            .previous_fuel_before(before)
            .map_err(|e| e.to_string())
    }

    async fn usage_between(
        &self,
        after: Option<&NaiveDateTime>,
        before: &NaiveDateTime,
    ) -> Result<Vec<UsageRecord>, String> {
        self.db
            .usage_between(after, before)
            .map_err(|e| e.to_string())
    }

    async fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>, String> {
        self.db.recent_usage(limit).map_err(|e| e.to_string())
    }

    async fn recent_fuel(&self, limit: usize) -> Result<Vec<FuelRecord>, String> {
        self.db.recent_fuel(limit).map_err(|e| e.to_string())
    }
}
