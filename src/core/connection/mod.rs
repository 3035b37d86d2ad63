//! Connection layer for the telemetry link
//!
//! A connection hands out raw chunks with a bounded wait. An empty chunk
//! means the read timeout elapsed without data; it is never an error.

mod serial;

pub use serial::{list_ports, SerialConnection};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Default baud rate for the receiver link
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default port name for the current platform
pub fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM4"
    } else {
        "/dev/ttyUSB0"
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Port name (e.g., COM4, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Maximum wait per read before an empty chunk is returned
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Create a new configuration with the default read timeout
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set read timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(default_port(), DEFAULT_BAUD_RATE)
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} baud", self.port, self.baud_rate)
    }
}

/// Errors raised while opening a connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Port already in use
    #[error("Port already in use: {0}")]
    PortInUse(String),

    /// Any other open failure
    #[error("Failed to open {port}: {reason}")]
    OpenFailed {
        /// Port name
        port: String,
        /// Driver message
        reason: String,
    },
}

/// A byte source with bounded-timeout reads.
///
/// Implementations own their handle exclusively. `close` must be safe to
/// call any number of times, including on a handle that never opened.
pub trait Connection {
    /// Read whatever arrived within the timeout window.
    ///
    /// Returns an empty chunk when the window elapsed without data. Any
    /// other failure is an I/O error and ends the session.
    fn read_chunk(&mut self) -> io::Result<Bytes>;

    /// Release the handle
    fn close(&mut self);
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn read_chunk(&mut self) -> io::Result<Bytes> {
        (**self).read_chunk()
    }

    fn close(&mut self) {
        (**self).close();
    }
}
