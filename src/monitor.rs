//! The polling loop: scan, print, append, sleep until the next cycle is due.

use crate::csv_log::CsvLog;
use crate::error::Result;
use crate::format::{format_elapsed, render_block, TIMESTAMP_FORMAT};
use crate::reading::{Reading, TemperatureUnit};
use crate::source::ReadingSource;
use chrono::{DateTime, Local};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_OUTPUT: &str = "govee_temperatures.csv";

/// Extra time a source gets past its scan timeout to shut its scan down.
const SCAN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub scan_timeout: Duration,
    pub output: PathBuf,
    pub unit: TemperatureUnit,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            interval: DEFAULT_INTERVAL,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            output: PathBuf::from(DEFAULT_OUTPUT),
            unit: TemperatureUnit::default(),
        }
    }
}

impl MonitorConfig {
    /// Scan timeout never exceeds the polling interval.
    pub fn effective_scan_timeout(&self) -> Duration {
        self.scan_timeout.min(self.interval)
    }
}

/// Timing of the current monitoring run.
#[derive(Debug, Clone)]
pub struct Session {
    start: Instant,
    started_at: DateTime<Local>,
    output_path: PathBuf,
}

impl Session {
    pub fn start(output_path: impl Into<PathBuf>) -> Self {
        Session {
            start: Instant::now(),
            started_at: Local::now(),
            output_path: output_path.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Recorded(Reading),
    NotFound,
}

pub struct Monitor<S, W> {
    source: S,
    terminal: W,
    log: CsvLog,
    session: Session,
    config: MonitorConfig,
    cycles: u64,
    device: Option<String>,
}

impl<S: ReadingSource, W: Write> Monitor<S, W> {
    /// Open the output file and start the session clock.
    pub fn new(source: S, terminal: W, config: MonitorConfig) -> Result<Self> {
        let log = CsvLog::open(&config.output)?;
        let session = Session::start(&config.output);
        Ok(Monitor {
            source,
            terminal,
            log,
            session,
            config,
            cycles: 0,
            device: None,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn terminal(&self) -> &W {
        &self.terminal
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Only a failure to write the output file ends the loop with an error.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        tokio::pin!(shutdown);
        info!(
            interval = ?self.config.interval,
            output = %self.session.output_path().display(),
            "monitoring started at {}",
            self.session.started_at().format(TIMESTAMP_FORMAT)
        );

        loop {
            let cycle_start = Instant::now();
            tokio::select! {
                _ = &mut shutdown => break,
                outcome = self.cycle() => {
                    outcome?;
                }
            }

            let next = cycle_start + self.config.interval;
            if next <= Instant::now() {
                debug!("cycle overran the interval, starting the next one immediately");
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep_until(next) => {}
            }
        }

        info!(cycles = self.cycles, "monitoring stopped");
        Ok(())
    }

    /// Run a single scan and record its result.
    pub async fn cycle(&mut self) -> Result<CycleOutcome> {
        self.cycles += 1;
        let scan_timeout = self.config.effective_scan_timeout();
        debug!(cycle = self.cycles, timeout = ?scan_timeout, "starting scan");

        let scan = self.source.scan(scan_timeout);
        let reading = match timeout(scan_timeout + SCAN_GRACE, scan).await {
            Ok(Ok(Some(reading))) if !reading.is_empty() => reading,
            Ok(Ok(_)) => return Ok(self.not_found()),
            Ok(Err(e)) => {
                warn!(error = %e, "scan failed");
                return Ok(self.not_found());
            }
            Err(_) => {
                warn!(timeout = ?scan_timeout, "scan did not finish in time");
                return Ok(self.not_found());
            }
        };

        self.record(&reading)?;
        Ok(CycleOutcome::Recorded(reading))
    }

    fn record(&mut self, reading: &Reading) -> Result<()> {
        if self.device.as_deref() != Some(reading.device_id.as_str()) {
            self.print(&format!("Found H5055 device: {}\n", reading.device_id));
            self.device = Some(reading.device_id.clone());
        }

        let elapsed = self.session.elapsed();
        self.print(&render_block(reading, elapsed, self.config.unit));
        self.log.append(&format_elapsed(elapsed), reading, self.config.unit)?;
        debug!(
            device = %reading.device_id,
            probes = reading.probes.len(),
            output = %self.log.path().display(),
            "row appended"
        );
        Ok(())
    }

    fn not_found(&mut self) -> CycleOutcome {
        info!(cycle = self.cycles, "no device found");
        self.print("No Govee H5055 temperature readings available.\n");
        CycleOutcome::NotFound
    }

    fn print(&mut self, text: &str) {
        if let Err(e) = self
            .terminal
            .write_all(text.as_bytes())
            .and_then(|_| self.terminal.flush())
        {
            warn!(error = %e, "failed to write to terminal");
        }
    }
}
