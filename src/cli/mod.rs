//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Argument parsing for both binaries
//! - Exit codes for automation

pub mod args;
pub mod exit_codes;

pub use args::{CaptureArgs, ConcatArgs};
pub use exit_codes::{exit_code_description, CliResult, ExitCodes};
