//! Single-replica transport
//!
//! [`ReplicaTransport`] is the RPC boundary to one block store endpoint.
//! [`GrpcReplicaClient`] implements it over the `BlockStore` gRPC service:
//! writes are client-streaming, reads are server-streaming, and every call
//! is bounded by a per-attempt deadline.

use crate::chunk::Chunker;
use async_trait::async_trait;
use blockrep_common::config::endpoint_uri;
use blockrep_common::{
    BlockId, BlockRead, ClientConfig, Error, Result, StatusCode, TransportError, TransportOutcome,
};
use blockrep_proto::store::ReadRequest;
use blockrep_proto::store::block_store_client::BlockStoreClient;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

/// RPC boundary to one replica.
///
/// `Err` means the call mechanics failed and the caller may fail over.
/// `Ok` is the replica's definitive answer, even when its status code is
/// negative.
#[async_trait]
pub trait ReplicaTransport: Send + Sync {
    /// Store `payload` as the content of `block_id`
    async fn write(&self, block_id: &BlockId, payload: &[u8]) -> TransportOutcome<StatusCode>;

    /// Fetch the content of `block_id`
    async fn read(&self, block_id: &BlockId) -> TransportOutcome<BlockRead>;
}

/// gRPC client for one block store endpoint.
///
/// Cloning is cheap; clones share the underlying connection, and each call
/// opens its own stream on it.
#[derive(Clone, Debug)]
pub struct GrpcReplicaClient {
    address: String,
    client: BlockStoreClient<Channel>,
    chunker: Chunker,
    rpc_timeout: Duration,
}

impl GrpcReplicaClient {
    /// Build a client for `address` using the limits in `config`.
    ///
    /// The connection is established on first use, so an unreachable
    /// replica shows up as a transport failure on the first call rather
    /// than here. Must be called inside a tokio runtime.
    pub fn new(address: &str, config: &ClientConfig) -> Result<Self> {
        let uri = endpoint_uri(address);
        let channel = Endpoint::from_shared(uri.clone())
            .map_err(|e| Error::configuration(format!("invalid endpoint {address:?}: {e}")))?
            .connect_timeout(config.connect_timeout())
            .connect_lazy();

        info!("Configured block store endpoint {}", uri);
        Ok(Self::from_channel(
            uri,
            channel,
            Chunker::new(config.chunk_size)?,
            config.rpc_timeout(),
        )
        .with_max_message_size(config.max_message_size))
    }

    /// Wrap an existing channel
    #[must_use]
    pub fn from_channel(
        address: impl Into<String>,
        channel: Channel,
        chunker: Chunker,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            client: BlockStoreClient::new(channel),
            chunker,
            rpc_timeout,
        }
    }

    #[must_use]
    fn with_max_message_size(mut self, limit: usize) -> Self {
        self.client = self
            .client
            .max_decoding_message_size(limit)
            .max_encoding_message_size(limit);
        self
    }

    /// Endpoint URI this client talks to
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn with_deadline<T, F>(&self, op: &str, call: F) -> TransportOutcome<T>
    where
        F: std::future::Future<Output = TransportOutcome<T>>,
    {
        match tokio::time::timeout(self.rpc_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("{} to {} failed: {}", op, self.address, e);
                Err(e)
            }
            Err(_) => {
                warn!(
                    "Timeout after {:?} on {} to {}",
                    self.rpc_timeout, op, self.address
                );
                Err(TransportError::DeadlineExceeded(self.rpc_timeout))
            }
        }
    }
}

fn classify(status: tonic::Status) -> TransportError {
    match status.code() {
        tonic::Code::Unavailable => TransportError::Unavailable(status.message().to_string()),
        _ => TransportError::Rpc(status),
    }
}

#[async_trait]
impl ReplicaTransport for GrpcReplicaClient {
    async fn write(&self, block_id: &BlockId, payload: &[u8]) -> TransportOutcome<StatusCode> {
        let requests = self.chunker.chunks(block_id, payload);
        debug!(
            block = %block_id,
            bytes = payload.len(),
            chunks = requests.len(),
            "sending write to {}",
            self.address
        );

        let mut client = self.client.clone();
        let reply = self
            .with_deadline("write", async move {
                let response = client
                    .send_write(futures::stream::iter(requests))
                    .await
                    .map_err(classify)?;
                Ok::<_, TransportError>(response.into_inner())
            })
            .await?;

        // An incomplete write reports the store's status, a completed one
        // is success regardless of the code it carries.
        Ok(if reply.completed {
            StatusCode::OK
        } else {
            StatusCode::new(reply.status_code)
        })
    }

    async fn read(&self, block_id: &BlockId) -> TransportOutcome<BlockRead> {
        debug!(block = %block_id, "sending read to {}", self.address);

        let mut client = self.client.clone();
        let request = ReadRequest {
            block_id: block_id.to_hex(),
        };
        self.with_deadline("read", async move {
            let mut stream = client
                .send_read(request)
                .await
                .map_err(classify)?
                .into_inner();

            let mut payload = BytesMut::new();
            // A non-OK status at any point, including after chunks arrived,
            // surfaces here as an error and the partial payload is dropped.
            while let Some(chunk) = stream.message().await.map_err(classify)? {
                if chunk.status_code < 0 {
                    return Ok(BlockRead {
                        payload: Bytes::new(),
                        status: StatusCode::new(chunk.status_code),
                    });
                }
                if chunk.size != chunk.buf.len() as u64 {
                    return Err(TransportError::Protocol(format!(
                        "chunk declares {} bytes but carries {}",
                        chunk.size,
                        chunk.buf.len()
                    )));
                }
                payload.extend_from_slice(&chunk.buf);
            }

            Ok::<_, TransportError>(BlockRead {
                payload: payload.freeze(),
                status: StatusCode::OK,
            })
        })
        .await
    }
}
