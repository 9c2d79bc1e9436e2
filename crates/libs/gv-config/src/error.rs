//! Configuration error types.

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// TOML deserialization failed.
    #[error(transparent)]
    Deserialization(#[from] toml::de::Error),

    /// The bind address is not a socket address.
    #[error("Invalid bind address '{0}'")]
    InvalidBind(String),

    /// The path case policy is neither `sensitive` nor `insensitive`.
    #[error("Invalid path case '{0}'. Expected 'sensitive' or 'insensitive'")]
    InvalidPathCase(String),

    /// At least one scan worker is required.
    #[error("scan_fan_out must be at least 1")]
    InvalidFanOut,
}
