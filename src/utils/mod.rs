//! Utility modules

pub mod concat;
