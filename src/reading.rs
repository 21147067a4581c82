use chrono::{DateTime, Local};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;

/// Probe temperatures reported by one device during one scan.
///
/// Temperatures are stored in degrees Celsius keyed by the 1-based probe index,
/// conversion to the display unit happens when rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: String,
    pub timestamp: DateTime<Local>,
    pub probes: BTreeMap<u8, f32>,
}

impl Reading {
    pub fn new(device_id: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Reading {
            device_id: device_id.into(),
            timestamp,
            probes: BTreeMap::new(),
        }
    }

    pub fn with_probe(mut self, probe: u8, celsius: f32) -> Self {
        self.probes.insert(probe, celsius);
        self
    }

    /// Highest probe index present, 0 when no probe reported.
    pub fn max_probe(&self) -> u8 {
        self.probes.keys().next_back().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn convert(self, celsius: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Celsius => write!(f, "celsius"),
            TemperatureUnit::Fahrenheit => write!(f, "fahrenheit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_probe_follows_highest_index() {
        let reading = Reading::new("dev", Local::now())
            .with_probe(3, 20.0)
            .with_probe(1, 21.0);
        assert_eq!(reading.max_probe(), 3);
        assert_eq!(Reading::new("dev", Local::now()).max_probe(), 0);
    }

    #[test]
    fn fahrenheit_conversion() {
        assert!((TemperatureUnit::Fahrenheit.convert(100.0) - 212.0).abs() < 0.001);
        assert!((TemperatureUnit::Fahrenheit.convert(-40.0) + 40.0).abs() < 0.001);
        assert_eq!(TemperatureUnit::Celsius.convert(72.5), 72.5);
    }
}
