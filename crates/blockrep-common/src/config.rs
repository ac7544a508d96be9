//! Configuration types for blockrep
//!
//! This module defines the client configuration shared by the library and
//! the CLI. Every field has a default so a partial TOML file is enough.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default primary replica address
pub const DEFAULT_PRIMARY: &str = "localhost:50051";

/// Default backup replica address
pub const DEFAULT_BACKUP: &str = "localhost:50052";

/// Default size of one write chunk (4 KB)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Root configuration for a replicated block client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Primary replica address (`host:port` or URI)
    pub primary: String,
    /// Backup replica address (`host:port` or URI)
    pub backup: String,
    /// Retry and backoff settings applied per replica
    pub retry: RetryConfig,
    /// Deadline for a single attempt against one replica (milliseconds)
    pub rpc_timeout_ms: u64,
    /// Deadline for establishing a connection (milliseconds)
    pub connect_timeout_ms: u64,
    /// Largest payload slice sent in one write message
    pub chunk_size: usize,
    /// Maximum gRPC message size in either direction
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY.to_string(),
            backup: DEFAULT_BACKUP.to_string(),
            retry: RetryConfig::default(),
            rpc_timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_size: 64 * 1024 * 1024, // 64 MB
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::configuration(e.to_string()))
    }

    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Check the configuration before any endpoint is built
    pub fn validate(&self) -> Result<()> {
        if self.primary.trim().is_empty() {
            return Err(Error::configuration("primary address is empty"));
        }
        if self.backup.trim().is_empty() {
            return Err(Error::configuration("backup address is empty"));
        }
        if self.chunk_size == 0 {
            return Err(Error::configuration("chunk_size must be positive"));
        }
        if self.chunk_size > self.max_message_size {
            return Err(Error::configuration(format!(
                "chunk_size {} exceeds max_message_size {}",
                self.chunk_size, self.max_message_size
            )));
        }
        if self.rpc_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(Error::configuration("timeouts must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::configuration("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Retry and backoff configuration
///
/// The delay after attempt `i` (zero-based) is
/// `base_delay_ms + i * multiplier_ms`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per replica before failing over
    pub max_attempts: u32,
    /// Delay after the first failed attempt (milliseconds)
    pub base_delay_ms: u64,
    /// Added delay per further attempt (milliseconds)
    pub multiplier_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            multiplier_ms: 100,
        }
    }
}

/// Turn a `host:port` address into a URI tonic can connect to
#[must_use]
pub fn endpoint_uri(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}
