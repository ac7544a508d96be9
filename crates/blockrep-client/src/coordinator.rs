//! Replication coordinator
//!
//! Public surface of the client. Owns the primary and backup transports and
//! applies the failover policy to every call:
//!
//! ```text
//! START ─► TRY_CHOSEN ──answered──────────────► DONE
//!              │
//!              └─transport failure─► TRY_OTHER ──answered──► DONE
//!                                        │
//!                                        └─transport failure─► FAILED
//! ```
//!
//! Writes always start at the primary; reads start at a replica picked by
//! the injected [`ReplicaSelector`]. Each attempt sequence is wrapped in the
//! [`RetryPolicy`]. A replica that answers, even with a negative status, ends
//! the call: only transport failures move on to the other replica.

use crate::retry::RetryPolicy;
use crate::select::{RandomSelector, ReplicaSelector};
use crate::translate::{BlockTranslator, Sha256Translator};
use crate::transport::{GrpcReplicaClient, ReplicaTransport};
use blockrep_common::{
    BlockId, ClientConfig, Error, FailureCause, Replica, Result, StatusCode, TransportOutcome,
};
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Acknowledgement of a replicated write
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteReceipt {
    pub block_id: BlockId,
    /// Replica that accepted the write
    pub replica: Replica,
    /// Status reported by that replica (never negative)
    pub status: StatusCode,
}

impl fmt::Display for WriteReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Write Received")
    }
}

/// Result of a replicated read
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadReceipt {
    pub block_id: BlockId,
    /// Replica the payload came from
    pub replica: Replica,
    pub payload: Bytes,
}

impl fmt::Display for ReadReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Read Received")
    }
}

/// Client for a block store replicated on a primary and a backup
pub struct ReplicationCoordinator<T = GrpcReplicaClient, B = Sha256Translator> {
    primary: T,
    backup: T,
    translator: B,
    retry: RetryPolicy,
    selector: Box<dyn ReplicaSelector>,
}

impl ReplicationCoordinator {
    /// Build gRPC transports for both replicas from `config`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let primary = GrpcReplicaClient::new(&config.primary, config)?;
        let backup = GrpcReplicaClient::new(&config.backup, config)?;
        info!(
            primary = primary.address(),
            backup = backup.address(),
            max_attempts = config.retry.max_attempts,
            "Replicated block client ready"
        );
        Ok(Self::new(
            primary,
            backup,
            Sha256Translator,
            RetryPolicy::from_config(&config.retry),
            RandomSelector::new(),
        ))
    }
}

impl<T: ReplicaTransport, B: BlockTranslator> ReplicationCoordinator<T, B> {
    /// Create a coordinator; `selector` picks the replica each read tries
    /// first
    pub fn new(
        primary: T,
        backup: T,
        translator: B,
        retry: RetryPolicy,
        selector: impl ReplicaSelector + 'static,
    ) -> Self {
        Self {
            primary,
            backup,
            translator,
            retry,
            selector: Box::new(selector),
        }
    }

    /// Replace the source of the initial read replica
    #[must_use]
    pub fn with_selector(mut self, selector: impl ReplicaSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Transport for one of the replicas
    #[must_use]
    pub const fn replica(&self, replica: Replica) -> &T {
        match replica {
            Replica::Primary => &self.primary,
            Replica::Backup => &self.backup,
        }
    }

    /// Write `payload` as the content of `path`.
    ///
    /// Tries the primary, then the backup's write path if the primary could
    /// not be reached.
    pub async fn write(&self, path: &str, payload: &[u8]) -> Result<WriteReceipt> {
        let block_id = self.translator.translate(path)?;
        debug!(path, block = %block_id, bytes = payload.len(), "write");

        let (replica, outcome) = self
            .with_failover(Replica::Primary, "write", |r| {
                self.replica(r).write(&block_id, payload)
            })
            .await;

        match outcome {
            Ok(status) if status.is_error() => {
                warn!(path, %replica, %status, "write rejected");
                Err(Error::WriteFailure(FailureCause::Rejected { replica, status }))
            }
            Ok(status) => {
                info!(path, %replica, bytes = payload.len(), "write received");
                Ok(WriteReceipt {
                    block_id,
                    replica,
                    status,
                })
            }
            Err(source) => {
                error!(path, code = source.code(), "write failed on both replicas: {source}");
                Err(Error::WriteFailure(FailureCause::Unreachable { replica, source }))
            }
        }
    }

    /// Read the content of `path` from whichever replica answers.
    ///
    /// The first replica is chosen by the selector; the other one is only
    /// tried if the first could not be reached. The payload is not compared
    /// across replicas.
    pub async fn read(&self, path: &str) -> Result<ReadReceipt> {
        let block_id = self.translator.translate(path)?;
        let first = self.selector.choose();
        debug!(path, block = %block_id, first = %first, "read");

        let (replica, outcome) = self
            .with_failover(first, "read", |r| self.replica(r).read(&block_id))
            .await;

        match outcome {
            Ok(read) if read.status.is_error() => {
                let status = read.status;
                warn!(path, %replica, %status, "read rejected");
                Err(Error::ReadFailure(FailureCause::Rejected { replica, status }))
            }
            Ok(read) => {
                info!(path, %replica, bytes = read.payload.len(), "read received");
                Ok(ReadReceipt {
                    block_id,
                    replica,
                    payload: read.payload,
                })
            }
            Err(source) => {
                error!(path, code = source.code(), "read failed on both replicas: {source}");
                Err(Error::ReadFailure(FailureCause::Unreachable { replica, source }))
            }
        }
    }

    /// Run `op` against `first` with retries, then against the other
    /// replica if every attempt was a transport failure. Returns the replica
    /// whose outcome is final.
    async fn with_failover<R, F, Fut>(
        &self,
        first: Replica,
        op_name: &str,
        op: F,
    ) -> (Replica, TransportOutcome<R>)
    where
        F: Fn(Replica) -> Fut,
        Fut: Future<Output = TransportOutcome<R>>,
    {
        match self.retry.run(|| op(first)).await {
            Err(e) => {
                let other = first.other();
                warn!(
                    "{} on {} exhausted {} attempts ({}), failing over to {}",
                    op_name,
                    first,
                    self.retry.max_attempts(),
                    e,
                    other
                );
                (other, self.retry.run(|| op(other)).await)
            }
            answered => (first, answered),
        }
    }
}
