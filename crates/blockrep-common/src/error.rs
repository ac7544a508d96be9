//! Error types for blockrep
//!
//! This module defines the errors a caller of the replicated block client
//! can observe.

use crate::types::{Replica, StatusCode, TransportError};
use thiserror::Error;

/// Common result type for blockrep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for blockrep
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("Write Failure: {0}")]
    WriteFailure(FailureCause),

    #[error("Read Failure: {0}")]
    ReadFailure(FailureCause),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Why a replicated write or read did not succeed
#[derive(Debug, Error)]
pub enum FailureCause {
    /// A replica answered with a negative status code
    #[error("{replica} rejected the request with status {status}")]
    Rejected { replica: Replica, status: StatusCode },

    /// Both replicas exhausted their retries with transport failures
    #[error("no replica reachable, last error from {replica}: {source}")]
    Unreachable {
        replica: Replica,
        #[source]
        source: TransportError,
    },
}

impl Error {
    /// Create an invalid path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this is a retryable error
    ///
    /// Only calls that failed because no replica could be reached are worth
    /// repeating later; rejections and invalid input are definitive.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::WriteFailure(FailureCause::Unreachable { .. })
                | Self::ReadFailure(FailureCause::Unreachable { .. })
        )
    }

    /// Status code reported by the replica that rejected the call
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::WriteFailure(FailureCause::Rejected { status, .. })
            | Self::ReadFailure(FailureCause::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
