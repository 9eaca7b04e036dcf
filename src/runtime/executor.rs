//! Intake session runtime executor

use super::traits::LedgerStore;
use super::SseEvent;
use crate::allocation::{allocate, render_allocation, AllocationWindow};
use crate::ledger::FuelRecord;
use crate::report::render_recent;
use crate::state_machine::{transition, Effect, Event, IntakeContext, IntakeState, Menu};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Sent when a ledger read or write fails mid-flow
pub const STORE_FAILURE_TEXT: &str =
    "Sorry, something went wrong while accessing the records. Use /view_records to check what was saved, then start again if needed.";

const DEFAULT_RECENT_LIMIT: usize = 10;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Runtime for one conversation's intake session, generic over the ledger
pub struct SessionRuntime<S>
where
    S: LedgerStore + 'static,
{
    context: IntakeContext,
    state: IntakeState,
    ledger: S,
    recent_limit: usize,
    idle_timeout: Duration,
    event_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
}

impl<S> SessionRuntime<S>
where
    S: LedgerStore + 'static,
{
    pub fn new(
        context: IntakeContext,
        ledger: S,
        event_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
    ) -> Self {
        Self {
            context,
            state: IntakeState::Idle,
            ledger,
            recent_limit: DEFAULT_RECENT_LIMIT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            event_rx,
            broadcast_tx,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(conv_id = %self.context.conversation_id, "Starting session runtime");

        loop {
            let event = if self.state.is_idle() {
                match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    // Nobody is listening and nothing is in progress
                    Err(_) if self.broadcast_tx.receiver_count() == 0 => {
                        tracing::debug!(
                            conv_id = %self.context.conversation_id,
                            "Releasing idle session"
                        );
                        break;
                    }
                    Err(_) => continue,
                }
            } else {
                match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await {
                    Ok(Some(event)) => event,
                    Ok(None) => break,
                    Err(_) => {
                        tracing::info!(
                            conv_id = %self.context.conversation_id,
                            flow = ?self.state.flow(),
                            step = self.state.step_name(),
                            "Session expired"
                        );
                        Event::IdleTimeout
                    }
                }
            };

            if let Err(e) = self.process_event(event).await {
                tracing::error!(error = %e, "Error handling event");
                let _ = self.broadcast_tx.send(SseEvent::Error { message: e });
            }
        }

        tracing::info!(conv_id = %self.context.conversation_id, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), String> {
        // Ledger lookups feed events back in, so process in a loop
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            // Pure state transition
            let result = transition(&self.state, &self.context, current_event)
                .map_err(|e| e.to_string())?;

            let old_state = std::mem::replace(&mut self.state, result.new_state);
            self.notify_step_change(&old_state);

            for effect in result.effects {
                match self.execute_effect(effect).await {
                    Ok(Some(generated_event)) => events_to_process.push(generated_event),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            conv_id = %self.context.conversation_id,
                            error = %e,
                            "Ledger operation failed, discarding session"
                        );
                        let old_state = std::mem::take(&mut self.state);
                        self.notify_step_change(&old_state);
                        self.reply(STORE_FAILURE_TEXT.to_string(), None);
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    fn notify_step_change(&self, old_state: &IntakeState) {
        let step = self.state.step_name();
        if old_state.step_name() != step {
            tracing::debug!(
                conv_id = %self.context.conversation_id,
                from = old_state.step_name(),
                to = step,
                "State transition"
            );
            let state = serde_json::to_value(&self.state).unwrap_or(serde_json::Value::Null);
            let _ = self.broadcast_tx.send(SseEvent::StateChange { state });
        }
    }

    fn reply(&self, text: String, menu: Option<Menu>) {
        // No subscribers is fine; the reply is simply not seen
        let _ = self.broadcast_tx.send(SseEvent::Reply { text, menu });
    }

    async fn execute_effect(&self, effect: Effect) -> Result<Option<Event>, String> {
        match effect {
            Effect::Reply { text, menu } => {
                self.reply(text, menu);
                Ok(None)
            }

            Effect::LookupPreviousOdometer { before } => {
                let reading = self.ledger.latest_odometer_before(&before).await?;
                Ok(Some(Event::PreviousOdometer { reading }))
            }

            Effect::PersistUsage { record } => {
                self.ledger.insert_usage(&record).await?;
                tracing::info!(
                    conv_id = %self.context.conversation_id,
                    participants = record.participants.len(),
                    miles = record.miles,
                    "Usage recorded"
                );
                Ok(None)
            }

            Effect::PersistFuel { record } => {
                self.ledger.insert_fuel(&record).await?;
                tracing::info!(
                    conv_id = %self.context.conversation_id,
                    payer = %record.payer,
                    cost = record.cost,
                    "Fuel recorded"
                );
                Ok(None)
            }

            Effect::AllocateFuel { record } => {
                let text = self.allocate_fuel(&record).await?;
                self.reply(text, None);
                Ok(None)
            }

            Effect::ShowRecentRecords => {
                let usage = self.ledger.recent_usage(self.recent_limit).await?;
                let fuel = self.ledger.recent_fuel(self.recent_limit).await?;
                self.reply(render_recent(&usage, &fuel), None);
                Ok(None)
            }
        }
    }

    async fn allocate_fuel(&self, record: &FuelRecord) -> Result<String, String> {
        let previous = self.ledger.previous_fuel_before(&record.date).await?;
        let window = AllocationWindow::for_fuel(record, previous.as_ref());
        let usage = self
            .ledger
            .usage_between(window.after.as_ref(), &window.before)
            .await?;

        let allocation = allocate(record.cost, &usage);
        tracing::info!(
            conv_id = %self.context.conversation_id,
            usage_records = usage.len(),
            total_miles = allocation.total_miles,
            unattributed = allocation.cost - allocation.fuel_total(),
            participants = allocation.shares.len(),
            "Fuel cost allocated"
        );

        Ok(render_allocation(&allocation))
    }
}
