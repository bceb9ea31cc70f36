use autoshift_lib::sweep::TargetCodeError;
use autoshift_lib::{PublishError, StoreError};
use autoshift_sources::{FetchError, SourceError};
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// Record file could not be read or written
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Source definitions could not be loaded
    #[error("{0}")]
    Source(#[from] SourceError),

    /// Bad positional code arguments
    #[error("{0}")]
    TargetCodes(#[from] TargetCodeError),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] FetchError),

    /// GitHub client could not be built
    #[error("{0}")]
    Publish(#[from] PublishError),

    /// `--expires` value that no date format matches
    #[error("Invalid --expires timestamp: '{0}'")]
    InvalidTimestamp(String),

    /// Logger could not be installed or the log file opened
    #[error("Logging error: {0}")]
    Logging(String),
}

impl CliError {
    pub(crate) fn invalid_timestamp(raw: impl Into<String>) -> Self {
        Self::InvalidTimestamp(raw.into())
    }

    pub(crate) fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }
}
