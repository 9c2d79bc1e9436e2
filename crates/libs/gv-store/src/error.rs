//! Store error types.

use crate::path::Rejection;

/// Errors raised while resolving or reading run artifacts.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The run identifier does not match the lexical pattern.
    #[error("Invalid run identifier")]
    InvalidIdentifierSyntax,

    /// The run identifier is well formed but not part of the allowlist.
    #[error("Run identifier not allowlisted")]
    IdentifierNotAllowlisted,

    /// A relative path failed sanitization or escaped its root.
    #[error("Path rejected: {0}")]
    PathRejected(Rejection),

    /// The run directory has no descriptor file.
    #[error("Run descriptor missing")]
    DescriptorMissing,

    /// The descriptor is not an object or lacks an identity field.
    #[error("Run descriptor malformed: {0}")]
    DescriptorMalformed(&'static str),

    /// The descriptor is not valid JSON.
    #[error(transparent)]
    DescriptorUnreadable(#[from] serde_json::Error),

    /// I/O failure other than a missing descriptor.
    #[error(transparent)]
    StorageUnavailable(#[from] std::io::Error),
}

impl From<Rejection> for Error {
    fn from(value: Rejection) -> Self {
        Error::PathRejected(value)
    }
}

impl Error {
    /// Whether this error must be reported to callers as "not found".
    ///
    /// Identifier and path rejections are deliberately folded together with a missing
    /// descriptor so a caller cannot tell an unknown run from a traversal attempt.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::InvalidIdentifierSyntax
                | Error::IdentifierNotAllowlisted
                | Error::PathRejected(_)
                | Error::DescriptorMissing
        )
    }
}
