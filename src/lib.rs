//! # Loralog Core Library
//!
//! Captures line-oriented text telemetry from a serial-connected device,
//! stamps every line with the wall-clock capture time and writes it to both
//! the console and an append-only log file.
//!
//! ## Pipeline
//!
//! - [`Connection`](crate::core::connection::Connection): bounded-timeout reads
//!   from the serial link
//! - [`LineAssembler`]: bytes to text lines, tolerant of malformed UTF-8
//! - [`Clock`] / [`Record`]: capture-time stamping
//! - [`DualSink`]: console plus durable log file, in identical order
//! - [`Session`]: the loop that owns all of the above until shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use loralog_core::{CancelToken, SerialConnection, Session, SessionConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::default();
//!     let cancel = CancelToken::install_ctrlc_handler()?;
//!
//!     let session = Session::start(&config, SerialConnection::open, std::io::stdout())?;
//!     let report = session.run(&cancel);
//!     eprintln!("{}", report.reason);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;
pub mod utils;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::{AppConfig, ConfigError};
pub use crate::core::cancel::CancelToken;
pub use crate::core::connection::{Connection, ConnectionConfig, ConnectionError, SerialConnection};
pub use crate::core::line::{LineAssembler, LogLine};
pub use crate::core::logger::{DualSink, LogFile, SinkError};
pub use crate::core::session::{Session, SessionConfig, SessionReport, ShutdownReason, StartError};
pub use crate::core::state_machine::{SessionState, SessionStateMachine};
pub use crate::core::timestamp::{Clock, FixedClock, Record, SystemClock};
pub use crate::utils::concat::{concatenate, ConcatError, ConcatOptions, ConcatReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
