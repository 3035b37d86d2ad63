//! Process exit codes for the capture binary
//!
//! Scripts wrapping `loralog` tell a cancelled run from a failed one by these.

use crate::config::ConfigError;
use crate::core::session::{SessionReport, StartError};
use std::process::ExitCode;

/// Exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success, including an operator-cancelled session
    pub const SUCCESS: u8 = 0;

    /// The device could not be opened at startup
    pub const CONNECTION_FAILED: u8 = 1;

    /// Invalid arguments (clap's own usage errors use this code too)
    pub const INVALID_ARGS: u8 = 2;

    /// Read, write or log file failure during the session
    pub const IO_ERROR: u8 = 3;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 4;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// Outcome of one binary invocation, with the operator-facing message
#[derive(Debug)]
pub enum CliResult {
    /// Finished normally
    Success(Option<String>),

    /// Failed with an exit code
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Process exit status
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Message for stderr, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Status handed back from `main`
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Did the run succeed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<&StartError> for CliResult {
    fn from(err: &StartError) -> Self {
        match err {
            StartError::Connection(e) => Self::Error(ExitCodes::CONNECTION_FAILED, e.to_string()),
            StartError::LogFile { .. } => Self::Error(ExitCodes::IO_ERROR, err.to_string()),
        }
    }
}

impl From<&SessionReport> for CliResult {
    fn from(report: &SessionReport) -> Self {
        if report.reason.is_cancelled() {
            Self::Success(Some(report.reason.to_string()))
        } else {
            Self::Error(ExitCodes::IO_ERROR, report.reason.to_string())
        }
    }
}

impl From<&ConfigError> for CliResult {
    fn from(err: &ConfigError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

/// Short human-readable meaning of an exit code
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "Connection failed",
        2 => "Invalid arguments",
        3 => "I/O error",
        4 => "Configuration error",
        127 => "Internal error",
        _ => "Unknown error",
    }
}
