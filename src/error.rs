use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),
    #[error("no bluetooth adapter available")]
    NoAdapter,
    #[error("failed to open output file {}", .path.display())]
    OpenOutput { path: PathBuf, source: io::Error },
    #[error("failed to write to output file {}", .path.display())]
    WriteOutput { path: PathBuf, source: io::Error },
}

impl Error {
    /// Errors that end the monitoring session instead of being retried next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::OpenOutput { .. } | Error::WriteOutput { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
