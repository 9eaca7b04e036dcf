//! Runtime for intake sessions
//!
//! One background task per conversation owns that conversation's intake
//! state. Inbound messages are queued to it and replies fan out to every
//! subscribed stream.

mod executor;
pub mod traits;


pub use executor::SessionRuntime;
pub use traits::*;

use crate::ledger::Database;
use crate::state_machine::{Event, IntakeContext, Menu};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime = SessionRuntime<DatabaseLedger>;

/// Settings shared by every session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub roster: Vec<String>,
    pub odometer_floor: i64,
    /// How many records of each kind `/view_records` shows
    pub recent_limit: usize,
    /// An unfinished flow is discarded after this long without a message
    pub idle_timeout: Duration,
}

/// Manager for all session runtimes
pub struct RuntimeManager {
    ledger: DatabaseLedger,
    settings: SessionSettings,
    runtimes: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub event_tx: mpsc::Sender<Event>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
}

impl SessionHandle {
    /// The runtime behind this handle has stopped
    fn is_released(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Events sent to stream clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Reply {
        text: String,
        menu: Option<Menu>,
    },
    StateChange {
        /// Full state as JSON object (e.g., `{"type":"collecting_cost","payer":"Amos",...}`)
        state: serde_json::Value,
    },
    Error {
        message: String,
    },
}

impl RuntimeManager {
    pub fn new(db: Database, settings: SessionSettings) -> Self {
        Self {
            ledger: DatabaseLedger::new(db),
            settings,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the handle for a conversation, starting its runtime on first use
    ///
    /// A runtime releases itself once it is idle with no subscribers, so a
    /// later message starts a fresh one.
    pub async fn get_or_create(&self, conversation_id: &str) -> SessionHandle {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(conversation_id) {
                if !handle.is_released() {
                    return handle.clone();
                }
            }
        }

        let mut runtimes = self.runtimes.write().await;
        // Another request may have started it between the locks
        if let Some(handle) = runtimes.get(conversation_id) {
            if !handle.is_released() {
                return handle.clone();
            }
        }

        let context = IntakeContext::new(conversation_id, self.settings.roster.clone())
            .with_odometer_floor(self.settings.odometer_floor);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);

        let runtime: ProductionRuntime =
            SessionRuntime::new(context, self.ledger.clone(), event_rx, broadcast_tx.clone())
                .with_recent_limit(self.settings.recent_limit)
                .with_idle_timeout(self.settings.idle_timeout);

        // Start runtime in background
        let conv_id = conversation_id.to_string();
        let registry = Arc::clone(&self.runtimes);
        tokio::spawn(async move {
            runtime.run().await;

            // Leave a replacement started after release in place
            let mut runtimes = registry.write().await;
            if runtimes.get(&conv_id).is_some_and(SessionHandle::is_released) {
                runtimes.remove(&conv_id);
            }
            tracing::info!(conv_id = %conv_id, "Session runtime finished");
        });

        let handle = SessionHandle {
            event_tx,
            broadcast_tx,
        };
        runtimes.insert(conversation_id.to_string(), handle.clone());

        handle
    }

    /// Send an event to a conversation's runtime
    pub async fn send_event(&self, conversation_id: &str, event: Event) -> Result<(), String> {
        let handle = self.get_or_create(conversation_id).await;
        let event = match handle.event_tx.send(event).await {
            Ok(()) => return Ok(()),
            // Released between lookup and send; retry on a fresh runtime
            Err(mpsc::error::SendError(event)) => event,
        };

        let handle = self.get_or_create(conversation_id).await;
        handle
            .event_tx
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Subscribe to conversation updates
    pub async fn subscribe(&self, conversation_id: &str) -> broadcast::Receiver<SseEvent> {
        let handle = self.get_or_create(conversation_id).await;
        let rx = handle.broadcast_tx.subscribe();
        if !handle.is_released() {
            return rx;
        }
        // Released before the subscription took hold
        self.get_or_create(conversation_id).await.broadcast_tx.subscribe()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Direct ledger access for read-only queries outside a session
    pub fn ledger(&self) -> &DatabaseLedger {
        &self.ledger
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.runtimes.read().await.len()
    }
}
