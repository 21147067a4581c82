use crate::reading::{Reading, TemperatureUnit};
use std::fmt::Write;
use std::time::Duration;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format an elapsed duration as `M:SS`, or `H:MM:SS` once it reaches an hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn format_temperature(celsius: f32, unit: TemperatureUnit) -> String {
    format!("{:.1}", unit.convert(celsius))
}

/// Human readable block printed after each successful cycle.
pub fn render_block(reading: &Reading, elapsed: Duration, unit: TemperatureUnit) -> String {
    let mut out = format!(
        "\n[{}] T+{} Device: {}\n",
        reading.timestamp.format(TIMESTAMP_FORMAT),
        format_elapsed(elapsed),
        reading.device_id
    );
    for (probe, celsius) in &reading.probes {
        // writing into a String can't fail
        let _ = writeln!(
            out,
            "  Probe {}: {}{}",
            probe,
            format_temperature(*celsius, unit),
            unit.suffix()
        );
    }
    out
}
