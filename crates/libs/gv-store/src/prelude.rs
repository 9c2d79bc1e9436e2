//! Common types and utilities.

/// Store error type.
pub use crate::error::Error;

/// Store result type.
pub type Result<T> = core::result::Result<T, Error>;
