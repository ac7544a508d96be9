//! Path to block translation
//!
//! Every file path resolves to exactly one block. Both replicas are
//! addressed with the same [`BlockId`], so the translation must be a pure
//! function of the path: no per-process salt, no allocation table.

use blockrep_common::{BlockId, Error, Result};
use sha2::{Digest, Sha256};

/// Longest path accepted for translation, in bytes
pub const MAX_PATH_LEN: usize = 4096;

/// Strategy that maps file paths to block identifiers
pub trait BlockTranslator: Send + Sync {
    /// Resolve `path` to its block.
    ///
    /// Must be deterministic and must not map two different paths to the
    /// same block, otherwise writes to one file overwrite another.
    fn translate(&self, path: &str) -> Result<BlockId>;
}

/// Reject paths that cannot name a block
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_path("path is empty"));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(Error::invalid_path(format!(
            "path is {} bytes, limit is {MAX_PATH_LEN}",
            path.len()
        )));
    }
    if path.contains('\0') {
        return Err(Error::invalid_path("path contains a NUL byte"));
    }
    Ok(())
}

/// Default translator: the block id is the SHA-256 digest of the path bytes.
///
/// Paths are hashed verbatim, so `a/b` and `a//b` are different blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Translator;

impl BlockTranslator for Sha256Translator {
    fn translate(&self, path: &str) -> Result<BlockId> {
        validate_path(path)?;
        let digest: [u8; 32] = Sha256::digest(path.as_bytes()).into();
        Ok(BlockId::from_bytes(digest))
    }
}

impl<T: BlockTranslator + ?Sized> BlockTranslator for Box<T> {
    fn translate(&self, path: &str) -> Result<BlockId> {
        (**self).translate(path)
    }
}
