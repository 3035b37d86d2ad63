//! Record output: append-only log file plus console
//!
//! Every record goes to the console first and then to the file, which is
//! flushed (and optionally synced) before `emit` returns.

use crate::core::timestamp::{file_stamp, Record};
use chrono::NaiveDateTime;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default log file name prefix
pub const DEFAULT_PREFIX: &str = "lora_log";

/// Generate log filename with timestamp, e.g. `lora_log_20240101_000000.txt`
pub fn generate_log_filename(prefix: &str, started_at: NaiveDateTime) -> String {
    format!("{}_{}.txt", prefix, file_stamp(started_at))
}

/// Dual sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// Console write failed; nothing was appended to the file
    #[error("console write failed: {0}")]
    Console(#[source] io::Error),

    /// File append failed after the record reached the console
    #[error("log file write failed, console and file now differ: {0}")]
    File(#[source] io::Error),
}

/// Append-only log file
pub struct LogFile {
    path: PathBuf,
    file: Option<File>,
    sync: bool,
    lines_written: u64,
}

impl LogFile {
    /// Open (create or append) the file at `path`
    pub fn open(path: impl Into<PathBuf>, sync: bool) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        tracing::info!(path = %path.display(), "log file opened");

        Ok(Self {
            path,
            file: Some(file),
            sync,
            lines_written: 0,
        })
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Is the file still open
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Lines appended so far
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Append one line plus terminator and push it to storage
    pub fn append(&mut self, line: &str) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "log file is closed"))?;

        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        file.write_all(&buf)?;
        file.flush()?;
        if self.sync {
            file.sync_data()?;
        }

        self.lines_written += 1;
        Ok(())
    }

    /// Close the file. Later calls are no-ops.
    pub fn close(&mut self) -> io::Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let result = file.flush().and_then(|()| file.sync_all());
        tracing::info!(
            path = %self.path.display(),
            lines = self.lines_written,
            "log file closed"
        );
        result
    }
}

impl Drop for LogFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "log file close failed");
        }
    }
}

/// Console writer plus log file, fed in identical order
pub struct DualSink<W: Write> {
    console: W,
    file: LogFile,
}

impl<W: Write> DualSink<W> {
    /// Pair a console writer with an open log file
    pub fn new(console: W, file: LogFile) -> Self {
        Self { console, file }
    }

    /// Write one record to both outputs
    pub fn emit(&mut self, record: &Record) -> Result<(), SinkError> {
        let line = record.to_string();

        self.console
            .write_all(format!("{line}\n").as_bytes())
            .and_then(|()| self.console.flush())
            .map_err(SinkError::Console)?;

        self.file.append(&line).map_err(SinkError::File)
    }

    /// Records emitted to both outputs
    pub fn records(&self) -> u64 {
        self.file.lines_written()
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Console writer
    pub fn console(&self) -> &W {
        &self.console
    }

    /// Flush the console and close the log file, attempting both.
    ///
    /// Returns every failure. Later calls only re-flush the console.
    pub fn close(&mut self) -> Vec<SinkError> {
        let mut errors = Vec::new();
        if let Err(e) = self.console.flush() {
            errors.push(SinkError::Console(e));
        }
        if let Err(e) = self.file.close() {
            errors.push(SinkError::File(e));
        }
        errors
    }
}
