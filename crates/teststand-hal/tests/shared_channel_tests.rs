//! Shared handle behavior across threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use teststand_config::StandConfig;
use teststand_hal::prelude::*;

#[test]
fn test_concurrent_reader_and_writer() -> Result<(), Box<dyn std::error::Error>> {
    let sim = SimulatedChannel::with_seed(&StandConfig::hotfire(), 11);
    let control = sim.control();
    let channel = SharedChannel::new(Box::new(sim));

    let reads = Arc::new(AtomicUsize::new(0));
    let reader = {
        let channel = channel.clone();
        let reads = Arc::clone(&reads);
        thread::spawn(move || {
            for _ in 0..200 {
                if channel.read_analog().is_ok() {
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
    };

    for i in 0..100 {
        channel.apply(&ValveCommand::new("Vent", i % 2 == 0))?;
    }
    reader.join().map_err(|_| "reader thread panicked")?;

    assert_eq!(reads.load(Ordering::Relaxed), 200);
    assert_eq!(control.writes().len(), 100);
    assert_eq!(control.valve_state("Vent"), Some(false));
    Ok(())
}

#[test]
fn test_close_through_handle() {
    let sim = SimulatedChannel::with_seed(&StandConfig::hotfire(), 3);
    let control = sim.control();
    let channel = SharedChannel::new(Box::new(sim));
    assert_eq!(channel.name(), teststand_hal::SIMULATED_DEVICE_NAME);

    channel.close();
    channel.close();

    assert!(control.is_closed());
    assert!(matches!(channel.read_analog(), Err(DeviceError::Closed(_))));
    assert!(matches!(
        channel.apply(&ValveCommand::close("MOV")),
        Err(HalError::Device(DeviceError::Closed(_)))
    ));
}

#[test]
fn test_unknown_valve_leaves_outputs_untouched() {
    let sim = SimulatedChannel::with_seed(&StandConfig::hotfire(), 5);
    let control = sim.control();
    let channel = SharedChannel::new(Box::new(sim));

    let result = channel.apply(&ValveCommand::open("Purge"));

    assert!(matches!(result, Err(ref e) if e.is_configuration_error()));
    assert!(control.writes().is_empty());
    assert_eq!(control.valve_state("MOV"), Some(false));
}
