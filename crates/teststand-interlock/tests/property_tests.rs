//! Property tests for command gating under arbitrary operator input.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use teststand_hal::{SharedChannel, ValveCommand};
use teststand_interlock::prelude::*;
use teststand_telemetry::TelemetryHub;
use teststand_test_helpers::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Command {
    Arm,
    Fire,
    Toggle(bool),
    Abort,
    Reset,
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Arm),
        Just(Command::Fire),
        any::<bool>().prop_map(Command::Toggle),
        Just(Command::Abort),
        Just(Command::Reset),
    ]
}

/// State the interlock must reach, and whether the command is accepted.
fn expected(state: SystemState, command: Command) -> (SystemState, bool) {
    match (command, state) {
        (Command::Arm, SystemState::Safe) => (SystemState::Armed, true),
        (Command::Fire, SystemState::Armed) => (SystemState::Firing, true),
        (Command::Toggle(_), SystemState::Armed | SystemState::Firing) => (state, true),
        (Command::Abort, SystemState::Aborted) => (state, false),
        (Command::Abort, _) => (SystemState::Aborted, true),
        (Command::Reset, SystemState::Aborted) => (SystemState::Safe, true),
        _ => (state, false),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_commands_follow_state_machine(commands in prop::collection::vec(command(), 1..24)) {
        let config = small_stand_config();
        let channel = MockChannel::for_config(&config);
        // Long hold keeps FIRING stable for the whole case.
        let sequence = IgnitionSequence::from_pairs([(
            ValveCommand::open("MOV"),
            Some(Duration::from_secs(30)),
        )]);
        let interlock = Arc::new(
            Interlock::new(
                SharedChannel::new(Box::new(channel)),
                &config,
                sequence,
                Arc::new(TelemetryHub::new()),
            )
            .map_err(|e| TestCaseError::fail(e.to_string()))?,
        );

        for command in commands {
            let before = interlock.state();
            let (want_state, want_accepted) = expected(before, command);
            let accepted = match command {
                Command::Arm => interlock.arm().is_ok(),
                Command::Fire => interlock.begin_fire().is_ok(),
                Command::Toggle(level) => interlock.toggle_valve("Vent", level).is_ok(),
                Command::Abort => interlock.abort("property"),
                Command::Reset => interlock.reset().is_ok(),
            };
            prop_assert_eq!(accepted, want_accepted, "{:?} from {}", command, before);
            prop_assert_eq!(interlock.state(), want_state, "{:?} from {}", command, before);
        }

        interlock.abort("teardown");
        if interlock.is_sequence_running() {
            prop_assert!(interlock.wait_for_sequence(Duration::from_secs(2)).is_some());
        }
    }
}
