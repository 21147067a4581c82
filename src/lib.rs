//! Poll a Govee H5055 BLE meat thermometer and log its probe temperatures.
//!
//! ```rust,no_run
//! use govee_monitor::{BleScanner, DeviceFilter, Monitor, MonitorConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), govee_monitor::Error> {
//!     let scanner = BleScanner::new(DeviceFilter::Any).await?;
//!     let mut monitor = Monitor::new(scanner, std::io::stdout(), MonitorConfig::default())?;
//!     monitor.run(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```

mod csv_log;
mod error;
pub mod format;
pub mod govee;
mod monitor;
mod reading;
mod scanner;
mod source;

pub use btleplug::api::BDAddr;
pub use csv_log::CsvLog;
pub use error::{Error, Result};
pub use monitor::{
    CycleOutcome, Monitor, MonitorConfig, Session, DEFAULT_INTERVAL, DEFAULT_OUTPUT,
    DEFAULT_SCAN_TIMEOUT,
};
pub use reading::{Reading, TemperatureUnit};
pub use scanner::BleScanner;
pub use source::{DeviceFilter, ReadingSource};
