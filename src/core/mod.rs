//! Core module containing the capture pipeline
//!
//! This module provides:
//! - Serial connection with bounded-timeout reads
//! - Line assembly from raw byte chunks
//! - Capture-time stamping
//! - Dual sink (console + append-only log file)
//! - Session state machine and the session loop
//! - Cooperative cancellation

pub mod cancel;
pub mod connection;
pub mod line;
pub mod logger;
pub mod session;
pub mod state_machine;
pub mod timestamp;
