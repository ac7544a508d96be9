//! Write chunking
//!
//! Splits a block payload into the messages of one client-streaming write.
//!
//! ```text
//! Payload (10000 bytes, 4 KB chunks)
//! ├── Chunk 0:  offset 0     size 4096
//! ├── Chunk 1:  offset 4096  size 4096
//! └── Chunk 2:  offset 8192  size 1808    total_size 10000 on every chunk
//! ```

use blockrep_common::config::DEFAULT_CHUNK_SIZE;
use blockrep_common::{BlockId, Error, Result};
use blockrep_proto::store::WriteRequest;

/// Splits payloads into bounded write messages
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Chunker {
    /// Create a chunker with the given chunk size
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::configuration("chunk size must be positive"));
        }
        Ok(Self { chunk_size })
    }

    /// Get the chunk size
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Build the write messages for `payload`, ordered by offset
    #[must_use]
    pub fn chunks(&self, block_id: &BlockId, payload: &[u8]) -> Vec<WriteRequest> {
        let block_id = block_id.to_hex();
        let total_size = payload.len() as u64;

        if payload.is_empty() {
            return vec![WriteRequest {
                block_id,
                buf: Vec::new(),
                size: 0,
                offset: 0,
                total_size: 0,
            }];
        }

        payload
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(i, buf)| WriteRequest {
                block_id: block_id.clone(),
                buf: buf.to_vec(),
                size: buf.len() as u64,
                offset: (i * self.chunk_size) as u64,
                total_size,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> BlockId {
        BlockId::from_bytes([7; 32])
    }

    #[test]
    fn test_chunker_default() {
        assert_eq!(Chunker::default().chunk_size(), 4096);
        assert!(Chunker::new(0).is_err());
    }

    #[test]
    fn test_small_payload_is_one_chunk() {
        let chunker = Chunker::default();
        let reqs = chunker.chunks(&block(), b"hello");
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].buf, b"hello");
        assert_eq!(reqs[0].size, 5);
        assert_eq!(reqs[0].offset, 0);
        assert_eq!(reqs[0].total_size, 5);
        assert_eq!(reqs[0].block_id, block().to_hex());
    }

    #[test]
    fn test_exact_chunk_is_one_chunk() {
        let chunker = Chunker::default();
        let payload = vec![1u8; 4096];
        assert_eq!(chunker.chunks(&block(), &payload).len(), 1);
    }

    #[test]
    fn test_empty_payload() {
        let reqs = Chunker::default().chunks(&block(), &[]);
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].size, 0);
        assert_eq!(reqs[0].total_size, 0);
    }

    #[test]
    fn test_large_payload_spans_chunks() {
        let chunker = Chunker::new(4096).unwrap();
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reqs = chunker.chunks(&block(), &payload);

        assert_eq!(reqs.len(), 3);
        assert_eq!(
            reqs.iter().map(|r| r.offset).collect::<Vec<_>>(),
            vec![0, 4096, 8192]
        );
        assert_eq!(reqs[2].size, 1808);
        for r in &reqs {
            assert_eq!(r.size, r.buf.len() as u64);
            assert_eq!(r.total_size, 10_000);
        }

        let sum: u64 = reqs.iter().map(|r| r.size).sum();
        assert_eq!(sum, 10_000);
        let joined: Vec<u8> = reqs.into_iter().flat_map(|r| r.buf).collect();
        assert_eq!(joined, payload);
    }
}
