use crate::error::{Error, Result};
use crate::format::format_temperature;
use crate::reading::{Reading, TemperatureUnit};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Append-only CSV output.
///
/// Rows carry `probe_1..probe_N` columns where N is the highest probe index seen
/// so far in this run, so a row never shrinks below an earlier one. The header is
/// written together with the first row of an empty file.
#[derive(Debug)]
pub struct CsvLog {
    path: PathBuf,
    file: File,
    header_written: bool,
    columns: u8,
}

impl CsvLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_error = |source| Error::OpenOutput {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_error)?;
        let len = file.metadata().map_err(open_error)?.len();
        debug!(path = %path.display(), len, "opened output file");

        Ok(CsvLog {
            path,
            file,
            header_written: len > 0,
            columns: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of probe columns rows are currently rendered with.
    pub fn columns(&self) -> u8 {
        self.columns
    }

    /// Append one row for `reading`.
    ///
    /// Header and row go out in a single write so an interrupted process never
    /// leaves half a line behind.
    pub fn append(&mut self, t_plus: &str, reading: &Reading, unit: TemperatureUnit) -> Result<()> {
        let columns = self.columns.max(reading.max_probe());
        let mut buf = String::new();
        if !self.header_written {
            buf.push_str(&header(columns));
        }
        buf.push_str(&format_row(t_plus, reading, columns, unit));

        self.file
            .write_all(buf.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|source| Error::WriteOutput {
                path: self.path.clone(),
                source,
            })?;

        self.header_written = true;
        self.columns = columns;
        Ok(())
    }
}

pub fn header(columns: u8) -> String {
    let mut line = String::from("t_plus,device");
    for probe in 1..=columns {
        line.push_str(&format!(",probe_{}", probe));
    }
    line.push('\n');
    line
}

pub fn format_row(t_plus: &str, reading: &Reading, columns: u8, unit: TemperatureUnit) -> String {
    let mut fields = vec![escape(t_plus), escape(&reading.device_id)];
    for probe in 1..=columns {
        let value = reading
            .probes
            .get(&probe)
            .map(|celsius| format_temperature(*celsius, unit))
            .unwrap_or_default();
        fields.push(Cow::Owned(value));
    }
    let mut line = fields.join(",");
    line.push('\n');
    line
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
