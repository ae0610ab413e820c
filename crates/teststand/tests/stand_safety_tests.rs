//! Running stands tripped by their own watchdogs.

mod common;

use std::sync::Barrier;
use std::thread;
use std::time::Duration;

use common::{eventually, init_logging};
use teststand::prelude::*;
use teststand::{STOP_ABORT_REASON, WATCHDOG_TRIP_LABEL};
use teststand_interlock::ABORT_LABEL;
use teststand_test_helpers::prelude::*;

fn vent_hold(hold: Duration) -> IgnitionSequence {
    IgnitionSequence::from_pairs([(ValveCommand::open("Vent"), Some(hold))])
}

#[test]
fn test_overpressure_while_running_aborts() -> TestResult {
    init_logging();
    let config = small_stand_config();
    let mock = MockChannel::for_config(&config);
    let handle = mock.handle();
    handle.set_default_values(&[("Ox_tank_pressure", 300.0)]);
    let stand = TestStand::with_sequence(config, Box::new(mock), vent_hold(Duration::from_secs(5)))?;
    let events = stand.subscribe_events();

    stand.start()?;
    assert!(stand.arm().is_accepted());
    assert!(stand.start_ignition().is_accepted());
    assert!(eventually(Duration::from_secs(1), || handle.last_state("Vent") == Some(true)));

    handle.set_default_values(&[("Ox_tank_pressure", 850.0)]);
    assert!(eventually(Duration::from_secs(2), || stand.state() == SystemState::Aborted));
    stand.stop()?;

    assert_eq!(
        stand.last_abort_reason().as_deref(),
        Some("Ox_tank_pressure over limit (850.0 > 800)")
    );
    assert_eq!(handle.last_state("Vent"), Some(false));

    let trips: Vec<Event> = events
        .try_iter()
        .filter(|e| e.label == WATCHDOG_TRIP_LABEL)
        .collect();
    assert_eq!(trips.len(), 1);
    Ok(())
}

#[test]
fn test_device_stall_trips_heartbeat() -> TestResult {
    init_logging();
    let config = small_stand_config();
    let mock = MockChannel::for_config(&config);
    let handle = mock.handle();
    for _ in 0..100 {
        handle.push_failure();
    }
    let stand = TestStand::with_sequence(config, Box::new(mock), vent_hold(Duration::from_secs(1)))?;
    assert!(stand.arm().is_accepted());

    stand.start()?;
    assert!(eventually(Duration::from_secs(2), || stand.state() == SystemState::Aborted));
    stand.stop()?;

    assert_eq!(stand.last_abort_reason().as_deref(), Some("DAQ heartbeat timeout"));
    assert!(stand.stats().skipped_ticks > 0);
    assert_eq!(stand.stats().successful_ticks(), 0);
    Ok(())
}

#[test]
fn test_healthy_stand_stays_armed() -> TestResult {
    let config = small_stand_config();
    let mock = MockChannel::for_config(&config);
    mock.handle().set_default_values(&[("Ox_tank_pressure", 300.0)]);
    let stand = TestStand::with_sequence(config, Box::new(mock), vent_hold(Duration::from_secs(1)))?;
    let samples = stand.subscribe_samples();
    assert!(stand.arm().is_accepted());

    stand.start()?;
    let first = samples.recv_timeout(Duration::from_secs(1))?;
    std::thread::sleep(Duration::from_millis(200));
    stand.stop()?;

    let pressure = first.value("Ox_tank_pressure").ok_or("missing channel")?;
    assert!((pressure - 300.0).abs() < f64::EPSILON);
    assert_eq!(stand.state(), SystemState::Armed);
    let history = stand.history("Ox_tank_pressure").ok_or("no history")?;
    assert!(history.len() >= 5);
    Ok(())
}

#[test]
fn test_stop_while_firing_aborts() -> TestResult {
    let config = small_stand_config();
    let mock = MockChannel::for_config(&config);
    let handle = mock.handle();
    handle.set_default_values(&[("Ox_tank_pressure", 300.0)]);
    let stand = TestStand::with_sequence(config, Box::new(mock), vent_hold(Duration::from_secs(10)))?;

    stand.start()?;
    assert!(stand.arm().is_accepted());
    assert!(stand.start_ignition().is_accepted());
    stand.stop()?;

    assert_eq!(stand.state(), SystemState::Aborted);
    assert_eq!(stand.last_abort_reason().as_deref(), Some(STOP_ABORT_REASON));
    assert_eq!(handle.last_state("Vent"), Some(false));
    assert!(!stand.is_running());
    Ok(())
}

#[test]
fn test_operator_abort_racing_watchdog_trip_acts_once() -> TestResult {
    for _ in 0..20 {
        let config = small_stand_config();
        let mock = MockChannel::for_config(&config);
        let handle = mock.handle();
        handle.set_default_values(&[("Ox_tank_pressure", 900.0)]);
        let stand = TestStand::with_sequence(config, Box::new(mock), IgnitionSequence::default())?;
        assert!(stand.arm().is_accepted());
        // Two violations in; the next tick from either poller trips.
        stand.poll_once();
        stand.poll_once();
        let events = stand.subscribe_events();
        handle.clear_writes();

        let barrier = Barrier::new(4);
        let operator_outcomes: Vec<CommandOutcome> = thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    barrier.wait();
                    stand.poll_once();
                });
            }
            let operators: Vec<_> = (0..2)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        stand.abort("operator")
                    })
                })
                .collect();
            operators.into_iter().filter_map(|h| h.join().ok()).collect()
        });

        assert_eq!(operator_outcomes.len(), 2);
        assert!(operator_outcomes.iter().all(CommandOutcome::is_accepted));
        let operator_performed = operator_outcomes
            .iter()
            .filter(|o| o.reason.is_none())
            .count();
        let labels: Vec<String> = events.try_iter().map(|e| e.label).collect();
        let aborts = labels.iter().filter(|l| *l == ABORT_LABEL).count();
        let trips = labels.iter().filter(|l| *l == WATCHDOG_TRIP_LABEL).count();

        assert_eq!(stand.state(), SystemState::Aborted);
        assert_eq!(aborts, 1, "{labels:?}");
        assert_eq!(trips + operator_performed, 1, "{labels:?}");
        assert_eq!(
            handle.commands(),
            vec![ValveCommand::close("Vent"), ValveCommand::close("MOV")]
        );
    }
    Ok(())
}
