//! HTTP API for the car-share ledger
//!
//! Chat messages go in over POST and replies come back on a per-conversation
//! event stream.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::ledger::Database;
use crate::runtime::{RuntimeManager, SessionSettings};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(db: Database, settings: SessionSettings) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(db, settings)),
        }
    }
}
