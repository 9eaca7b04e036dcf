//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> IntakeContext {
    IntakeContext::new(
        "test-conv",
        vec![
            "Amos".to_string(),
            "David".to_string(),
            "Ngee Feng".to_string(),
        ],
    )
}

fn received_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 20)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn user_text(text: &str) -> Event {
    Event::UserText {
        text: text.to_string(),
        received_at: received_at(),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Amos".to_string()),
        Just("David".to_string()),
        "[A-Z][a-z]{2,8}",
    ]
    .prop_filter("menu options are not names", |name| {
        !["others", "other", "done", "now"].contains(&name.to_lowercase().as_str())
    })
}

fn arb_participants() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_name(), 1..4)
}

fn arb_date() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..2000).prop_map(|days| received_at() - chrono::Duration::days(days))
}

fn arb_active_state() -> impl Strategy<Value = IntakeState> {
    prop_oneof![
        proptest::collection::vec(arb_name(), 0..4)
            .prop_map(|participants| IntakeState::CollectingParticipants { participants }),
        arb_participants()
            .prop_map(|participants| IntakeState::AddingCustomParticipant { participants }),
        arb_participants()
            .prop_map(|participants| IntakeState::CollectingUsageDate { participants }),
        (arb_participants(), arb_date())
            .prop_map(|(participants, date)| IntakeState::CollectingOdometer { participants, date }),
        (arb_participants(), arb_date(), 1000i64..200_000).prop_map(
            |(participants, date, odometer)| IntakeState::ResolvingMileage {
                participants,
                date,
                odometer,
            }
        ),
        (arb_participants(), arb_date(), 1000i64..200_000, 0i64..500).prop_map(
            |(participants, date, odometer, miles)| IntakeState::CollectingToll {
                participants,
                date,
                odometer,
                miles,
            }
        ),
        (arb_participants(), arb_date(), 1000i64..200_000, 0i64..500, 0.0f64..50.0).prop_map(
            |(participants, date, odometer, miles, toll)| IntakeState::CollectingTitle {
                participants,
                date,
                odometer,
                miles,
                toll,
            }
        ),
        Just(IntakeState::CollectingPayer),
        arb_name().prop_map(|payer| IntakeState::CollectingFuelDate { payer }),
        (arb_name(), arb_date()).prop_map(|(payer, date)| IntakeState::CollectingCost { payer, date }),
    ]
}

fn arb_state() -> impl Strategy<Value = IntakeState> {
    prop_oneof![Just(IntakeState::Idle), arb_active_state()]
}

fn arb_non_cancel_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Start),
        Just(Command::IndicateUsage),
        Just(Command::IndicateFuel),
        Just(Command::ViewRecords),
        "[a-z]{3,10}".prop_map(Command::Unknown),
    ]
}

fn arb_reply_text() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_name(),
        Just("Others".to_string()),
        Just("Done".to_string()),
        Just("Now".to_string()),
        Just("2024-01-15".to_string()),
        (1000i64..200_000).prop_map(|n| n.to_string()),
        (0u32..10_000).prop_map(|c| format!("{}.{:02}", c / 100, c % 100)),
        "[a-zA-Z0-9 ]{0,20}",
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        6 => arb_reply_text().prop_map(|text| user_text(&text)),
        1 => arb_non_cancel_command().prop_map(Event::Command),
        1 => Just(Event::Command(Command::Cancel)),
        1 => proptest::option::of(1000i64..200_000)
            .prop_map(|reading| Event::PreviousOdometer { reading }),
        1 => Just(Event::IdleTimeout),
    ]
}

fn arb_invalid_date() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{3,12}".prop_filter("not now", |s| !s.eq_ignore_ascii_case("now")),
        (1u32..28, 1u32..12, 2000u32..2030).prop_map(|(d, m, y)| format!("{d:02}/{m:02}/{y}")),
        (2000u32..2030).prop_map(|y| format!("{y}-13-01")),
    ]
}

/// Fields of the state that must survive a rejected reply
fn collected_fields(state: &IntakeState) -> (Vec<String>, Option<NaiveDateTime>) {
    let date = match state {
        IntakeState::CollectingOdometer { date, .. }
        | IntakeState::ResolvingMileage { date, .. }
        | IntakeState::CollectingToll { date, .. }
        | IntakeState::CollectingTitle { date, .. }
        | IntakeState::CollectingCost { date, .. } => Some(*date),
        _ => None,
    };
    (state.participants().to_vec(), date)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Records are only persisted on the way back to Idle
    #[test]
    fn prop_persist_only_when_returning_idle(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = IntakeState::Idle;
        let ctx = test_context();

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                let persists = result.effects.iter().any(|e| {
                    matches!(e, Effect::PersistUsage { .. } | Effect::PersistFuel { .. })
                });
                if persists {
                    prop_assert!(result.new_state.is_idle(), "Persisted mid-flow: {:?}", result.new_state);
                }
                state = result.new_state;
            }
        }
    }

    // Cancel from anywhere reaches Idle and touches nothing in the ledger
    #[test]
    fn prop_cancel_always_idle(state in arb_state()) {
        let result = transition(&state, &test_context(), Event::Command(Command::Cancel));
        prop_assert!(result.is_ok(), "Cancel failed: {:?}", result);
        let result = result.unwrap();
        prop_assert_eq!(result.new_state, IntakeState::Idle);
        prop_assert_eq!(result.effects, vec![Effect::reply(CANCELLED_TEXT)]);
    }

    // Commands other than /cancel abandon an active flow
    #[test]
    fn prop_command_mid_flow_discards_session(
        state in arb_active_state(),
        command in arb_non_cancel_command()
    ) {
        let result = transition(&state, &test_context(), Event::Command(command)).unwrap();
        prop_assert_eq!(result.new_state, IntakeState::Idle);
        let only_replies = result.effects.iter().all(|e| matches!(e, Effect::Reply { .. }));
        prop_assert!(only_replies);
    }

    // An unparseable date never advances and never loses fields
    #[test]
    fn prop_invalid_date_keeps_state(
        participants in arb_participants(),
        payer in arb_name(),
        text in arb_invalid_date()
    ) {
        let ctx = test_context();
        for state in [
            IntakeState::CollectingUsageDate { participants: participants.clone() },
            IntakeState::CollectingFuelDate { payer: payer.clone() },
        ] {
            let result = transition(&state, &ctx, user_text(&text)).unwrap();
            prop_assert_eq!(&result.new_state, &state);
        }
    }

    // A rejected odometer, toll, title or cost keeps every collected field
    #[test]
    fn prop_rejected_reply_preserves_fields(
        state in arb_active_state(),
        text in prop_oneof![Just(String::new()), Just("-5".to_string()), Just("abc".to_string())]
    ) {
        // Selection accepts any text as a name
        prop_assume!(!matches!(state, IntakeState::CollectingParticipants { .. }));
        let before = collected_fields(&state);
        if let Ok(result) = transition(&state, &test_context(), user_text(&text)) {
            if !result.new_state.is_idle() && result.new_state.step_name() == state.step_name() {
                prop_assert_eq!(collected_fields(&result.new_state), before);
            }
        }
    }

    // Done with nobody selected never reaches the date step
    #[test]
    fn prop_done_requires_participants(done in prop_oneof![Just("Done"), Just("done"), Just(" DONE ")]) {
        let state = IntakeState::CollectingParticipants { participants: vec![] };
        let result = transition(&state, &test_context(), user_text(done)).unwrap();
        prop_assert_eq!(result.new_state, state);
    }

    // Participant selection only ever grows the list, repeats included
    #[test]
    fn prop_selection_appends(
        initial in proptest::collection::vec(arb_name(), 0..4),
        name in arb_name()
    ) {
        let state = IntakeState::CollectingParticipants { participants: initial.clone() };
        let result = transition(&state, &test_context(), user_text(&name)).unwrap();

        let mut expected = initial;
        expected.push(name);
        prop_assert_eq!(result.new_state.participants(), expected.as_slice());
    }

    // Miles are the difference from the previous reading and never negative
    #[test]
    fn prop_miles_from_previous_reading(
        participants in arb_participants(),
        date in arb_date(),
        previous in 1000i64..100_000,
        driven in 0i64..5000
    ) {
        let state = IntakeState::ResolvingMileage {
            participants,
            date,
            odometer: previous + driven,
        };
        let result = transition(
            &state,
            &test_context(),
            Event::PreviousOdometer { reading: Some(previous) },
        ).unwrap();

        match result.new_state {
            IntakeState::CollectingToll { miles, .. } => prop_assert_eq!(miles, driven),
            other => prop_assert!(false, "Expected CollectingToll, got {:?}", other),
        }
    }

    // Idle answers free text with a hint and stays idle
    #[test]
    fn prop_idle_text_gets_hint(text in "[a-zA-Z ]{1,30}") {
        let result = transition(&IntakeState::Idle, &test_context(), user_text(&text)).unwrap();
        prop_assert_eq!(result.new_state, IntakeState::Idle);
        prop_assert_eq!(result.effects, vec![Effect::reply(IDLE_HINT)]);
    }

    // Fuel cost is accepted only when strictly positive
    #[test]
    fn prop_cost_must_be_positive(payer in arb_name(), date in arb_date(), cents in -10_000i32..10_000) {
        let state = IntakeState::CollectingCost { payer, date };
        let text = format!("{}", f64::from(cents) / 100.0);
        let result = transition(&state, &test_context(), user_text(&text)).unwrap();

        if cents > 0 {
            prop_assert!(result.new_state.is_idle());
        } else {
            prop_assert_eq!(result.new_state, state);
        }
    }
}
