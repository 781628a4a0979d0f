//! Common utilities module
//!
//! Shared error type used across the calibration pipeline.

pub mod error;

pub use error::{CalibrationError, Result};
