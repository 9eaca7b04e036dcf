//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! next state and effects. Ledger reads needed mid-flow are requested as
//! effects and come back as events.

use super::input::{self, InputError};
use super::state::{IntakeContext, IntakeState, Menu, DONE_OPTION, OTHERS_OPTION};
use super::{Command, Effect, Event};
use crate::ledger::{FuelRecord, UsageRecord};
use chrono::NaiveDateTime;
use thiserror::Error;

pub const HELP_TEXT: &str = "Welcome. Commands:\n\
    /indicate_usage - Indicate your usage\n\
    /indicate_fuel - Indicate your fuel pump\n\
    /view_records - View the latest records\n\
    /cancel - Cancel the current entry";
pub const IDLE_HINT: &str =
    "No entry in progress. Send /indicate_usage or /indicate_fuel to start, or /start for help.";
pub const CANCELLED_TEXT: &str = "Conversation cancelled.";
pub const USAGE_SAVED_TEXT: &str = "Usage data saved successfully.";

const PARTICIPANTS_PROMPT: &str = "Please select the users that utilised the car:";
const CUSTOM_NAME_PROMPT: &str = "Please enter the name you would like to add:";
const USAGE_DATE_PROMPT: &str = "Please enter the date of the usage (YYYY-MM-DD) or select Now:";
const ODOMETER_PROMPT: &str = "Please enter the current number of miles shown on the dashboard:";
const TOLL_PROMPT: &str = "Please enter the toll amount for this trip:";
const TITLE_PROMPT: &str = "Please enter a title for the usage:";
const PAYER_PROMPT: &str = "Please select the user that paid for the fuel:";
const FUEL_DATE_PROMPT: &str = "Please enter the date of the fuel pump (YYYY-MM-DD) or select Now:";
const COST_PROMPT: &str = "Please enter the cost of the fuel pump:";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: IntakeState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: IntakeState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Why an in-progress flow was abandoned. The session is discarded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Abort {
    #[error("Cannot work out the miles driven: there is no usage record before {before}. Record a baseline odometer reading first, then start again.")]
    MissingPredecessor { before: NaiveDateTime },

    #[error("Sorry, something went wrong: {command} is not available in the middle of an entry. Please start again.")]
    UnexpectedCommand { command: Command },

    #[error("Session expired after a period of inactivity. Please start again.")]
    Expired,
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &IntakeState,
    context: &IntakeContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Cancellation
        // ============================================================
        (_, Event::Command(Command::Cancel)) => {
            Ok(TransitionResult::new(IntakeState::Idle).with_effect(Effect::reply(CANCELLED_TEXT)))
        }

        // ============================================================
        // Entry Points
        // ============================================================
        (IntakeState::Idle, Event::Command(Command::Start)) => {
            Ok(TransitionResult::new(IntakeState::Idle).with_effect(Effect::reply(HELP_TEXT)))
        }

        (IntakeState::Idle, Event::Command(Command::IndicateUsage)) => Ok(TransitionResult::new(
            IntakeState::CollectingParticipants {
                participants: vec![],
            },
        )
        .with_effect(participants_prompt(context))),

        (IntakeState::Idle, Event::Command(Command::IndicateFuel)) => {
            Ok(TransitionResult::new(IntakeState::CollectingPayer).with_effect(
                Effect::reply_with_menu(PAYER_PROMPT, Menu::payers(&context.roster)),
            ))
        }

        (IntakeState::Idle, Event::Command(Command::ViewRecords)) => {
            Ok(TransitionResult::new(IntakeState::Idle).with_effect(Effect::ShowRecentRecords))
        }

        (IntakeState::Idle, Event::Command(Command::Unknown(name))) => Ok(TransitionResult::new(
            IntakeState::Idle,
        )
        .with_effect(Effect::reply(format!("Unknown command /{name}.\n\n{HELP_TEXT}")))),

        (IntakeState::Idle, Event::UserText { .. }) => {
            Ok(TransitionResult::new(IntakeState::Idle).with_effect(Effect::reply(IDLE_HINT)))
        }

        (IntakeState::Idle, Event::IdleTimeout) => Ok(TransitionResult::new(IntakeState::Idle)),

        // ============================================================
        // Fallback: anything but /cancel while a flow is active
        // ============================================================
        (_, Event::Command(command)) => Ok(abort(Abort::UnexpectedCommand { command })),

        (_, Event::IdleTimeout) => Ok(abort(Abort::Expired)),

        // ============================================================
        // Usage Flow
        // ============================================================
        (IntakeState::CollectingParticipants { participants }, Event::UserText { text, .. }) => {
            Ok(select_participant(participants, &text, context))
        }

        (IntakeState::AddingCustomParticipant { participants }, Event::UserText { text, .. }) => {
            Ok(match input::parse_name(&text) {
                Ok(name) => add_participant(participants, name, context),
                Err(e) => retry(state, &e, None),
            })
        }

        (
            IntakeState::CollectingUsageDate { participants },
            Event::UserText { text, received_at },
        ) => Ok(match input::parse_date(&text, received_at) {
            Ok(date) => TransitionResult::new(IntakeState::CollectingOdometer {
                participants: participants.clone(),
                date,
            })
            .with_effect(Effect::reply(ODOMETER_PROMPT)),
            Err(e) => retry(state, &e, Some(Menu::date())),
        }),

        (IntakeState::CollectingOdometer { participants, date }, Event::UserText { text, .. }) => {
            Ok(match input::parse_odometer(&text, context.odometer_floor) {
                Ok(odometer) => TransitionResult::new(IntakeState::ResolvingMileage {
                    participants: participants.clone(),
                    date: *date,
                    odometer,
                })
                .with_effect(Effect::LookupPreviousOdometer { before: *date }),
                Err(e) => retry(state, &e, None),
            })
        }

        (
            IntakeState::ResolvingMileage {
                participants,
                date,
                odometer,
            },
            Event::PreviousOdometer { reading },
        ) => Ok(match reading {
            None => abort(Abort::MissingPredecessor { before: *date }),
            Some(previous) if previous > *odometer => {
                let error = InputError::OdometerBehindPrevious {
                    reading: *odometer,
                    previous,
                };
                TransitionResult::new(IntakeState::CollectingOdometer {
                    participants: participants.clone(),
                    date: *date,
                })
                .with_effect(Effect::reply(error.to_string()))
            }
            Some(previous) => TransitionResult::new(IntakeState::CollectingToll {
                participants: participants.clone(),
                date: *date,
                odometer: *odometer,
                miles: odometer - previous,
            })
            .with_effect(Effect::reply(TOLL_PROMPT)),
        }),

        (
            IntakeState::CollectingToll {
                participants,
                date,
                odometer,
                miles,
            },
            Event::UserText { text, .. },
        ) => Ok(match input::parse_toll(&text) {
            Ok(toll) => TransitionResult::new(IntakeState::CollectingTitle {
                participants: participants.clone(),
                date: *date,
                odometer: *odometer,
                miles: *miles,
                toll,
            })
            .with_effect(Effect::reply(TITLE_PROMPT)),
            Err(e) => retry(state, &e, None),
        }),

        (
            IntakeState::CollectingTitle {
                participants,
                date,
                odometer,
                miles,
                toll,
            },
            Event::UserText { text, .. },
        ) => Ok(match input::parse_title(&text) {
            Ok(title) => {
                let record = UsageRecord {
                    participants: participants.clone(),
                    date: *date,
                    miles: *miles,
                    odometer: *odometer,
                    toll: *toll,
                    title,
                };
                TransitionResult::new(IntakeState::Idle)
                    .with_effect(Effect::PersistUsage { record })
                    .with_effect(Effect::reply(USAGE_SAVED_TEXT))
            }
            Err(e) => retry(state, &e, None),
        }),

        // ============================================================
        // Fuel Flow
        // ============================================================
        (IntakeState::CollectingPayer, Event::UserText { text, .. }) => {
            Ok(match input::parse_name(&text) {
                Ok(payer) => TransitionResult::new(IntakeState::CollectingFuelDate { payer })
                    .with_effect(Effect::reply_with_menu(FUEL_DATE_PROMPT, Menu::date())),
                Err(e) => retry(state, &e, Some(Menu::payers(&context.roster))),
            })
        }

        (IntakeState::CollectingFuelDate { payer }, Event::UserText { text, received_at }) => {
            Ok(match input::parse_date(&text, received_at) {
                Ok(date) => TransitionResult::new(IntakeState::CollectingCost {
                    payer: payer.clone(),
                    date,
                })
                .with_effect(Effect::reply(COST_PROMPT)),
                Err(e) => retry(state, &e, Some(Menu::date())),
            })
        }

        (IntakeState::CollectingCost { payer, date }, Event::UserText { text, .. }) => {
            Ok(match input::parse_cost(&text) {
                Ok(cost) => {
                    let record = FuelRecord {
                        payer: payer.clone(),
                        date: *date,
                        cost,
                    };
                    TransitionResult::new(IntakeState::Idle)
                        .with_effect(Effect::PersistFuel {
                            record: record.clone(),
                        })
                        .with_effect(Effect::AllocateFuel { record })
                }
                Err(e) => retry(state, &e, None),
            })
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

// Helper functions

fn participants_prompt(context: &IntakeContext) -> Effect {
    Effect::reply_with_menu(PARTICIPANTS_PROMPT, Menu::participants(&context.roster))
}

fn select_participant(
    participants: &[String],
    text: &str,
    context: &IntakeContext,
) -> TransitionResult {
    let choice = text.trim();

    if choice.eq_ignore_ascii_case(OTHERS_OPTION) || choice.eq_ignore_ascii_case("Other") {
        return TransitionResult::new(IntakeState::AddingCustomParticipant {
            participants: participants.to_vec(),
        })
        .with_effect(Effect::reply(CUSTOM_NAME_PROMPT));
    }

    if choice.eq_ignore_ascii_case(DONE_OPTION) {
        if participants.is_empty() {
            return TransitionResult::new(IntakeState::CollectingParticipants {
                participants: vec![],
            })
            .with_effect(Effect::reply_with_menu(
                InputError::NoParticipants.to_string(),
                Menu::participants(&context.roster),
            ));
        }
        return TransitionResult::new(IntakeState::CollectingUsageDate {
            participants: participants.to_vec(),
        })
        .with_effect(Effect::reply_with_menu(USAGE_DATE_PROMPT, Menu::date()));
    }

    match input::parse_name(choice) {
        Ok(name) => add_participant(participants, name, context),
        Err(e) => TransitionResult::new(IntakeState::CollectingParticipants {
            participants: participants.to_vec(),
        })
        .with_effect(Effect::reply_with_menu(
            e.to_string(),
            Menu::participants(&context.roster),
        )),
    }
}

fn add_participant(
    participants: &[String],
    name: String,
    context: &IntakeContext,
) -> TransitionResult {
    let mut participants = participants.to_vec();
    participants.push(name);
    let confirmation = format!(
        "The name {} has been added to the list ({}).",
        participants.last().map_or("", String::as_str),
        participants.join(", ")
    );

    TransitionResult::new(IntakeState::CollectingParticipants { participants })
        .with_effect(Effect::reply(confirmation))
        .with_effect(participants_prompt(context))
}

/// Stay on the current step with the error as the reply
fn retry(state: &IntakeState, error: &InputError, menu: Option<Menu>) -> TransitionResult {
    TransitionResult::new(state.clone()).with_effect(Effect::Reply {
        text: error.to_string(),
        menu,
    })
}

fn abort(reason: Abort) -> TransitionResult {
    TransitionResult::new(IntakeState::Idle).with_effect(Effect::reply(reason.to_string()))
}
