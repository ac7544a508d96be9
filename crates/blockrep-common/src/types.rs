//! Core type definitions for blockrep
//!
//! This module defines the identifiers, status codes and transport failure
//! classification shared by the client and its tools.

use bytes::Bytes;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Integer code reported for a transport failure.
///
/// Application status codes never use this value; it marks "the RPC itself
/// did not complete" in logs and user-facing output.
pub const TRANSPORT_FAILURE_CODE: i32 = -10;

/// Length of a block identifier in bytes
pub const BLOCK_ID_LEN: usize = 32;

/// Identifier of the storage block a file path resolves to
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into)]
pub struct BlockId([u8; BLOCK_ID_LEN]);

impl BlockId {
    /// Create from raw bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; BLOCK_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; BLOCK_ID_LEN] {
        &self.0
    }

    /// Lowercase hex form used on the wire
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Application status code returned by a replica that answered the call.
///
/// Zero is success, negative values are errors reported by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[display("{_0}")]
pub struct StatusCode(i32);

impl StatusCode {
    /// Success
    pub const OK: Self = Self(0);

    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Whether the replica rejected the operation
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 < 0
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::OK
    }
}

/// One of the two replicas a client talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Replica {
    Primary,
    Backup,
}

impl Replica {
    /// The replica to fail over to
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Primary => Self::Backup,
            Self::Backup => Self::Primary,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
        }
    }
}

impl fmt::Display for Replica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The RPC mechanics failed: the replica could not be reached, the stream
/// broke, or the call did not finish in time.
///
/// Unlike an application [`StatusCode`], this is never the replica's answer,
/// so it is retried and then triggers failover.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("replica unavailable: {0}")]
    Unavailable(String),

    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Integer code for diagnostics, always [`TRANSPORT_FAILURE_CODE`]
    #[must_use]
    pub const fn code(&self) -> i32 {
        TRANSPORT_FAILURE_CODE
    }
}

/// Outcome of a single attempt against one replica.
///
/// `Err` is the transport failure sentinel; `Ok` carries whatever the
/// replica answered.
pub type TransportOutcome<T> = std::result::Result<T, TransportError>;

/// Data returned by a replica for a block read
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockRead {
    /// Concatenated chunk payloads. Only meaningful when `status` is not an
    /// error.
    pub payload: Bytes,
    /// Status of the read, negative when the store aborted the stream
    pub status: StatusCode,
}
