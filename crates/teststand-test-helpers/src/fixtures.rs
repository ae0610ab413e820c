//! Fixture builders for samples and configurations.

use std::time::Instant;

use teststand_config::{ChannelLimit, PhysicalAddress, SensorKind, StandConfig};
use teststand_hal::{AnalogReading, Sample, SampleBatch};

/// A sample stamped now.
pub fn sample(channel: &str, value: f64) -> Sample {
    Sample::new(Instant::now(), channel, value)
}

/// A batch stamped now from `(channel, value)` pairs.
pub fn batch(tick: u64, values: &[(&str, f64)]) -> SampleBatch {
    let reading: AnalogReading = values
        .iter()
        .map(|(channel, value)| ((*channel).to_string(), *value))
        .collect();
    SampleBatch::from_reading(tick, Instant::now(), &reading)
}

/// Minimal stand: one pressure channel limited at 800 with a debounce of 3,
/// `Vent` and `MOV` valves, 20 ms acquisition period, 10 ms sequencer poll.
pub fn small_stand_config() -> StandConfig {
    StandConfig::builder()
        .acquisition_period_ms(20)
        .sequence_poll_interval_ms(10)
        .channel(
            "Ox_tank_pressure",
            SensorKind::Pressure,
            PhysicalAddress::new("T7", "AIN0"),
        )
        .valve("Vent", PhysicalAddress::new("T7", "DIO1"), false)
        .valve("MOV", PhysicalAddress::new("T7", "DIO0"), false)
        .limit(ChannelLimit::new("Ox_tank_pressure", 800.0))
        .build()
        .unwrap()
}
