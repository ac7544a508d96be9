//! blockrep Client - Replicated block store access
//!
//! This crate maps file paths to storage blocks and reads and writes them on
//! a pair of replicas (primary and backup) over gRPC, retrying and failing
//! over when a replica cannot be reached.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │  ReplicationCoordinator  │  write / read by path
//! └────────────┬─────────────┘
//!              │  BlockTranslator (path → BlockId)
//!              │  RetryPolicy (bounded attempts, linear backoff)
//!      ┌───────┴────────┐
//! ┌────▼─────┐    ┌─────▼────┐
//! │ primary  │    │  backup  │  GrpcReplicaClient
//! └──────────┘    └──────────┘
//! ```

pub mod chunk;
pub mod coordinator;
pub mod retry;
pub mod select;
pub mod translate;
pub mod transport;

// Re-exports
pub use chunk::Chunker;
pub use coordinator::{ReadReceipt, ReplicationCoordinator, WriteReceipt};
pub use retry::RetryPolicy;
pub use select::{FixedSelector, RandomSelector, ReplicaSelector};
pub use translate::{BlockTranslator, Sha256Translator};
pub use transport::{GrpcReplicaClient, ReplicaTransport};
