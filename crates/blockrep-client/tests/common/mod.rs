//! In-process block store used by the integration tests.
//!
//! Serves the real `BlockStore` gRPC service on an ephemeral loopback port,
//! keeps blocks in memory, and can be told to misbehave.

#![allow(dead_code)]

use blockrep_common::{ClientConfig, RetryConfig};
use blockrep_proto::store::block_store_server::{BlockStore, BlockStoreServer};
use blockrep_proto::store::{ReadReply, ReadRequest, WriteReply, WriteRequest};
use futures::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

/// Status the store answers with for an unknown block
pub const NOT_FOUND: i32 = -2;

/// Chunk size used for read streams
pub const READ_CHUNK: usize = 1024;

/// How the store misbehaves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fault {
    #[default]
    None,
    /// Every call fails with UNAVAILABLE
    Unavailable,
    /// Writes are acknowledged as incomplete with this status
    RejectWrites(i32),
    /// Reads stream one chunk with this (negative) status
    RejectReads(i32),
    /// Reads stream the first chunk, then end with INTERNAL
    AbortReads,
    /// Reads stream one chunk whose declared size disagrees with its buffer
    BadFraming,
    /// Reads stream the first chunk of data, then a chunk with this status
    RejectAfterData(i32),
    /// Calls never answer
    Hang,
}

#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<HashMap<String, Vec<u8>>>,
    fault: Mutex<Fault>,
    pub write_calls: AtomicU32,
    pub read_calls: AtomicU32,
}

impl MemoryStore {
    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    pub fn put(&self, block_id: &str, data: &[u8]) {
        self.blocks.lock().insert(block_id.to_string(), data.to_vec());
    }

    pub fn get(&self, block_id: &str) -> Option<Vec<u8>> {
        self.blocks.lock().get(block_id).cloned()
    }

    pub fn writes(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> u32 {
        self.read_calls.load(Ordering::SeqCst)
    }

    fn fault(&self) -> Fault {
        *self.fault.lock()
    }
}

type ReadStream = Pin<Box<dyn Stream<Item = Result<ReadReply, Status>> + Send>>;

fn reply(buf: &[u8], status_code: i32) -> ReadReply {
    ReadReply {
        buf: buf.to_vec(),
        size: buf.len() as u64,
        status_code,
    }
}

#[tonic::async_trait]
impl BlockStore for MemoryStore {
    async fn send_write(
        &self,
        request: Request<Streaming<WriteRequest>>,
    ) -> Result<Response<WriteReply>, Status> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::Unavailable => return Err(Status::unavailable("replica down")),
            Fault::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            _ => {}
        }

        let mut stream = request.into_inner();
        let mut block_id = None;
        let mut data = Vec::new();
        let mut total_size = 0;
        while let Some(chunk) = stream.message().await? {
            if chunk.size != chunk.buf.len() as u64 || chunk.offset != data.len() as u64 {
                return Err(Status::invalid_argument("chunk accounting mismatch"));
            }
            block_id.get_or_insert(chunk.block_id);
            total_size = chunk.total_size;
            data.extend_from_slice(&chunk.buf);
        }
        let block_id = block_id.ok_or_else(|| Status::invalid_argument("empty write"))?;
        if data.len() as u64 != total_size {
            return Err(Status::invalid_argument("short write"));
        }

        if let Fault::RejectWrites(code) = self.fault() {
            return Ok(Response::new(WriteReply {
                completed: false,
                status_code: code,
            }));
        }

        self.blocks.lock().insert(block_id, data);
        Ok(Response::new(WriteReply {
            completed: true,
            status_code: 0,
        }))
    }

    type SendReadStream = ReadStream;

    async fn send_read(
        &self,
        request: Request<ReadRequest>,
    ) -> Result<Response<Self::SendReadStream>, Status> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let block_id = request.into_inner().block_id;

        let replies: Vec<Result<ReadReply, Status>> = match self.fault() {
            Fault::Unavailable => return Err(Status::unavailable("replica down")),
            Fault::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Vec::new()
            }
            Fault::RejectReads(code) => vec![Ok(reply(&[], code))],
            fault => match self.get(&block_id) {
                None => vec![Ok(reply(&[], NOT_FOUND))],
                Some(data) => {
                    let first = &data[..data.len().min(READ_CHUNK)];
                    match fault {
                        Fault::AbortReads => vec![
                            Ok(reply(first, 0)),
                            Err(Status::internal("disk error mid-stream")),
                        ],
                        Fault::BadFraming => {
                            let mut chunk = reply(first, 0);
                            chunk.size += 96;
                            vec![Ok(chunk)]
                        }
                        Fault::RejectAfterData(code) => {
                            vec![Ok(reply(first, 0)), Ok(reply(&[], code))]
                        }
                        _ => data.chunks(READ_CHUNK).map(|c| Ok(reply(c, 0))).collect(),
                    }
                }
            },
        };

        Ok(Response::new(Box::pin(futures::stream::iter(replies))))
    }
}

/// Serve `store` on an ephemeral loopback port
pub async fn spawn_store(store: Arc<MemoryStore>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        Server::builder()
            .add_service(BlockStoreServer::from_arc(store))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });
    addr
}

/// An address nothing listens on
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Client configuration with short timeouts and backoff
pub fn test_config(primary: SocketAddr, backup: SocketAddr) -> ClientConfig {
    ClientConfig {
        primary: primary.to_string(),
        backup: backup.to_string(),
        retry: RetryConfig {
            max_attempts: 2,
            base_delay_ms: 10,
            multiplier_ms: 10,
        },
        rpc_timeout_ms: 500,
        connect_timeout_ms: 200,
        ..ClientConfig::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
