//! Capture session
//!
//! A Session owns the connection and the log file from start to stop and
//! drives the read → assemble → stamp → emit loop. Resources are released
//! exactly once on every exit path: normal shutdown, I/O failure, or drop.

use crate::core::cancel::CancelToken;
use crate::core::connection::{Connection, ConnectionConfig, ConnectionError};
use crate::core::line::{LineAssembler, DEFAULT_MAX_LINE_BYTES};
use crate::core::logger::{generate_log_filename, DualSink, LogFile, SinkError, DEFAULT_PREFIX};
use crate::core::state_machine::{SessionState, SessionStateMachine, StateTransition};
use crate::core::timestamp::{Clock, Record, SystemClock};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connection settings, copied into the session at start
    pub connection: ConnectionConfig,
    /// Directory the log file is created in
    pub log_dir: PathBuf,
    /// Log file name prefix
    pub log_prefix: String,
    /// Sync the log file to disk after every record
    pub sync: bool,
    /// Cap on an unterminated line before it is flushed anyway
    pub max_line_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            log_dir: PathBuf::from("."),
            log_prefix: DEFAULT_PREFIX.to_string(),
            sync: true,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

/// Why a session failed to start
#[derive(Error, Debug)]
pub enum StartError {
    /// The device could not be opened; no log file was created
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The log file could not be created; the connection was closed again
    #[error("Failed to create log file {}: {source}", path.display())]
    LogFile {
        /// Intended log file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Why a running session stopped
#[derive(Debug)]
pub enum ShutdownReason {
    /// Operator interrupt
    Cancelled,
    /// The connection failed while reading
    ReadFailed(io::Error),
    /// A record could not be written to both outputs
    WriteFailed(SinkError),
}

impl ShutdownReason {
    /// Operator-initiated, not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Stopped by operator."),
            Self::ReadFailed(e) => write!(f, "Serial read failed: {e}"),
            Self::WriteFailed(e) => write!(f, "Record write failed: {e}"),
        }
    }
}

/// Outcome of a finished session
#[derive(Debug)]
pub struct SessionReport {
    /// Why the session stopped
    pub reason: ShutdownReason,
    /// Records written to both outputs
    pub records: u64,
    /// Log file path
    pub log_path: PathBuf,
    /// Errors raised while releasing resources
    pub cleanup_errors: Vec<String>,
    /// State transitions, oldest first
    pub transitions: Vec<StateTransition>,
}

/// Active capture session
pub struct Session<C: Connection, W: Write> {
    state: SessionStateMachine,
    connection: Option<C>,
    sink: Option<DualSink<W>>,
    assembler: LineAssembler,
    clock: Box<dyn Clock>,
    log_path: PathBuf,
}

impl<C: Connection, W: Write> Session<C, W> {
    /// Open the connection, then the log file, using the system clock
    pub fn start<F>(config: &SessionConfig, connect: F, console: W) -> Result<Self, StartError>
    where
        F: FnOnce(&ConnectionConfig) -> Result<C, ConnectionError>,
    {
        Self::start_with_clock(config, connect, console, Box::new(SystemClock))
    }

    /// Open the connection, then the log file, stamping with `clock`
    pub fn start_with_clock<F>(
        config: &SessionConfig,
        connect: F,
        console: W,
        clock: Box<dyn Clock>,
    ) -> Result<Self, StartError>
    where
        F: FnOnce(&ConnectionConfig) -> Result<C, ConnectionError>,
    {
        let mut state = SessionStateMachine::new();
        let log_path = config
            .log_dir
            .join(generate_log_filename(&config.log_prefix, clock.now()));

        let mut connection = match connect(&config.connection) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(port = %config.connection.port, error = %e, "connection failed");
                advance(&mut state, SessionState::Stopped, &e.to_string());
                return Err(e.into());
            }
        };

        let file = match LogFile::open(&log_path, config.sync) {
            Ok(file) => file,
            Err(source) => {
                tracing::error!(path = %log_path.display(), error = %source, "log file creation failed");
                advance(&mut state, SessionState::ShuttingDown, &source.to_string());
                connection.close();
                advance(&mut state, SessionState::Stopped, "connection closed");
                return Err(StartError::LogFile { path: log_path, source });
            }
        };

        advance(&mut state, SessionState::Running, "connection and log file open");

        Ok(Self {
            state,
            connection: Some(connection),
            sink: Some(DualSink::new(console, file)),
            assembler: LineAssembler::with_max_line_bytes(config.max_line_bytes),
            clock,
            log_path,
        })
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state.state()
    }

    /// Log file path, fixed for the whole session
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Capture until cancelled or an I/O error, then shut down
    pub fn run(mut self, cancel: &CancelToken) -> SessionReport {
        let reason = loop {
            if cancel.is_cancelled() {
                break ShutdownReason::Cancelled;
            }
            if let Err(reason) = self.step() {
                break reason;
            }
        };

        self.shutdown(reason)
    }

    /// One iteration: a bounded read, then every line it completes
    fn step(&mut self) -> Result<usize, ShutdownReason> {
        let (Some(connection), Some(sink)) = (self.connection.as_mut(), self.sink.as_mut()) else {
            return Err(ShutdownReason::ReadFailed(io::Error::new(
                io::ErrorKind::NotConnected,
                "session resources already released",
            )));
        };

        let chunk = connection.read_chunk().map_err(ShutdownReason::ReadFailed)?;
        if chunk.is_empty() {
            return Ok(0);
        }

        self.assembler.push(&chunk);
        let mut emitted = 0;
        while let Some(line) = self.assembler.next_line() {
            let record = Record::capture(line, self.clock.as_ref());
            sink.emit(&record).map_err(ShutdownReason::WriteFailed)?;
            emitted += 1;
        }

        Ok(emitted)
    }

    /// Close the connection, then the sink. Each is taken, so only the first call does anything.
    fn release(&mut self) -> Vec<String> {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }

        let Some(mut sink) = self.sink.take() else {
            return Vec::new();
        };
        sink.close()
            .into_iter()
            .map(|e| {
                tracing::warn!(error = %e, "sink close failed");
                e.to_string()
            })
            .collect()
    }

    fn shutdown(&mut self, reason: ShutdownReason) -> SessionReport {
        advance(&mut self.state, SessionState::ShuttingDown, &reason.to_string());

        let records = self.sink.as_ref().map_or(0, DualSink::records);
        let log_path = self
            .sink
            .as_ref()
            .map_or_else(|| self.log_path.clone(), |sink| sink.path().to_path_buf());

        let cleanup_errors = self.release();

        let discarded = self.assembler.discard_pending();
        if discarded > 0 {
            tracing::debug!(bytes = discarded, "discarded unterminated partial line");
        }

        advance(&mut self.state, SessionState::Stopped, "resources released");

        if reason.is_cancelled() {
            tracing::info!(records, "session stopped by operator");
        } else {
            tracing::error!(records, reason = %reason, "session stopped on I/O error");
        }

        SessionReport {
            reason,
            records,
            log_path,
            cleanup_errors,
            transitions: self.state.history().to_vec(),
        }
    }
}

impl<C: Connection, W: Write> Drop for Session<C, W> {
    fn drop(&mut self) {
        self.release();
    }
}

fn advance(state: &mut SessionStateMachine, to: SessionState, reason: &str) {
    if let Err(e) = state.transition(to, Some(reason)) {
        tracing::warn!(error = %e, "session state machine rejected transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timestamp::FixedClock;
    use bytes::Bytes;
    use chrono::NaiveDate;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Plays back reads, then cancels once the script runs out
    struct ScriptedConnection {
        script: VecDeque<io::Result<Bytes>>,
        cancel: CancelToken,
        releases: Rc<Cell<u32>>,
        open: bool,
    }

    impl ScriptedConnection {
        fn new(script: Vec<io::Result<Bytes>>, cancel: &CancelToken) -> Self {
            Self {
                script: script.into(),
                cancel: cancel.clone(),
                releases: Rc::new(Cell::new(0)),
                open: true,
            }
        }
    }

    impl Connection for ScriptedConnection {
        fn read_chunk(&mut self) -> io::Result<Bytes> {
            match self.script.pop_front() {
                Some(result) => result,
                None => {
                    self.cancel.cancel();
                    Ok(Bytes::new())
                }
            }
        }

        fn close(&mut self) {
            if self.open {
                self.open = false;
                self.releases.set(self.releases.get() + 1);
            }
        }
    }

    fn data(bytes: &'static [u8]) -> io::Result<Bytes> {
        Ok(Bytes::from_static(bytes))
    }

    fn clock() -> Box<dyn Clock> {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Box::new(FixedClock(at))
    }

    fn config(dir: &TempDir) -> SessionConfig {
        SessionConfig {
            log_dir: dir.path().to_path_buf(),
            sync: false,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_hello_record() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![data(b"Hello\r\n")], &cancel);
        let mut console = Vec::new();

        let session = Session::start_with_clock(&config(&dir), |_| Ok(connection), &mut console, clock()).unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.log_path(), dir.path().join("lora_log_20240101_000000.txt"));

        let report = session.run(&cancel);
        assert!(report.reason.is_cancelled());
        assert_eq!(report.records, 1);

        let expected = "[2024-01-01 00:00:00.000] Hello\n";
        assert_eq!(String::from_utf8(console).unwrap(), expected);
        assert_eq!(std::fs::read_to_string(&report.log_path).unwrap(), expected);
    }

    #[test]
    fn test_timeouts_record_nothing() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![data(b""), data(b""), data(b""), data(b"Ping\n")], &cancel);
        let mut console = Vec::new();

        let session = Session::start_with_clock(&config(&dir), |_| Ok(connection), &mut console, clock()).unwrap();
        let report = session.run(&cancel);

        assert_eq!(report.records, 1);
        assert_eq!(String::from_utf8(console).unwrap(), "[2024-01-01 00:00:00.000] Ping\n");
    }

    #[test]
    fn test_read_error_closes_once() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(
            vec![
                data(b"first\nsec"),
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")),
            ],
            &cancel,
        );
        let releases = Rc::clone(&connection.releases);
        let mut console = Vec::new();

        let session = Session::start_with_clock(&config(&dir), |_| Ok(connection), &mut console, clock()).unwrap();
        let report = session.run(&cancel);

        assert!(matches!(report.reason, ShutdownReason::ReadFailed(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(releases.get(), 1);
        assert_eq!(report.records, 1);
        assert!(report.cleanup_errors.is_empty());
        assert_eq!(
            std::fs::read_to_string(&report.log_path).unwrap(),
            "[2024-01-01 00:00:00.000] first\n"
        );

        let states: Vec<_> = report.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![SessionState::Running, SessionState::ShuttingDown, SessionState::Stopped]
        );
    }

    #[test]
    fn test_cancel_before_first_read() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![data(b"never read\n")], &cancel);
        let releases = Rc::clone(&connection.releases);

        let session = Session::start_with_clock(&config(&dir), |_| Ok(connection), Vec::new(), clock()).unwrap();
        cancel.cancel();
        let report = session.run(&cancel);

        assert!(report.reason.is_cancelled());
        assert_eq!(report.records, 0);
        assert_eq!(releases.get(), 1);
        assert_eq!(std::fs::read_to_string(&report.log_path).unwrap(), "");
    }

    #[test]
    fn test_connection_failure_creates_no_file() {
        let dir = TempDir::new().unwrap();

        let result = Session::<ScriptedConnection, _>::start_with_clock(
            &config(&dir),
            |cfg| Err(ConnectionError::PortNotFound(cfg.port.clone())),
            Vec::new(),
            clock(),
        );

        assert!(matches!(result, Err(StartError::Connection(ConnectionError::PortNotFound(_)))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_log_file_failure_closes_connection() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![], &cancel);
        let releases = Rc::clone(&connection.releases);
        let config = SessionConfig {
            log_dir: dir.path().join("missing").join("nested"),
            ..config(&dir)
        };

        let result = Session::start_with_clock(&config, |_| Ok(connection), Vec::new(), clock());

        assert!(matches!(result, Err(StartError::LogFile { .. })));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_drop_without_run_releases() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![], &cancel);
        let releases = Rc::clone(&connection.releases);

        let session = Session::start_with_clock(&config(&dir), |_| Ok(connection), Vec::new(), clock()).unwrap();
        drop(session);

        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_read_error_releases_sink_once() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(
            vec![
                data(b"kept\n"),
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")),
            ],
            &cancel,
        );
        let releases = Rc::clone(&connection.releases);

        let mut session = Session::start_with_clock(&config(&dir), |_| Ok(connection), Vec::new(), clock()).unwrap();
        assert_eq!(session.step().unwrap(), 1);
        let reason = session.step().unwrap_err();
        assert!(matches!(reason, ShutdownReason::ReadFailed(_)));

        let report = session.shutdown(reason);
        assert!(session.sink.is_none());
        assert!(session.connection.is_none());
        assert!(report.cleanup_errors.is_empty());
        assert_eq!(report.log_path, dir.path().join("lora_log_20240101_000000.txt"));
        assert_eq!(
            std::fs::read_to_string(&report.log_path).unwrap(),
            "[2024-01-01 00:00:00.000] kept\n"
        );

        // Nothing is left to close a second time
        assert!(session.release().is_empty());
        assert_eq!(session.state(), SessionState::Stopped);
        drop(session);
        assert_eq!(releases.get(), 1);
    }

    /// Console that accepts writes but refuses to flush
    struct UnflushableConsole;

    impl Write for UnflushableConsole {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout gone"))
        }
    }

    #[test]
    fn test_console_flush_failure_reported_at_shutdown() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![], &cancel);

        let session =
            Session::start_with_clock(&config(&dir), |_| Ok(connection), UnflushableConsole, clock()).unwrap();
        cancel.cancel();
        let report = session.run(&cancel);

        assert!(report.reason.is_cancelled());
        assert_eq!(report.cleanup_errors.len(), 1);
        assert!(report.cleanup_errors[0].contains("stdout gone"));
    }

    #[test]
    fn test_partial_line_discarded_at_shutdown() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let connection = ScriptedConnection::new(vec![data(b"done\nhalf")], &cancel);
        let mut console = Vec::new();

        let session = Session::start_with_clock(&config(&dir), |_| Ok(connection), &mut console, clock()).unwrap();
        let report = session.run(&cancel);

        assert_eq!(report.records, 1);
        assert_eq!(String::from_utf8(console).unwrap(), "[2024-01-01 00:00:00.000] done\n");
    }
}
