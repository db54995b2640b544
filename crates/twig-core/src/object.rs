//! Content-addressable blob store.
//!
//! Blobs are stored in `.twig/objects/` using a 2-character prefix
//! directory scheme (like git). Each blob is identified by the SHA-256
//! of its raw contents and stored as those raw bytes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{TwigError, TwigResult};
use crate::fsutil::atomic_write;
use crate::hash::{hash_bytes, is_full_digest};

/// Content-addressed storage for file contents.
pub struct ObjectStore {
    /// Root path: `.twig/objects/`
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(objects_dir: &Path) -> Self {
        Self {
            root: objects_dir.to_path_buf(),
        }
    }

    /// Store bytes and return their digest.
    ///
    /// Storing identical contents twice is a no-op that returns the
    /// same digest.
    pub fn put_blob(&self, data: &[u8]) -> TwigResult<String> {
        let digest = hash_bytes(data);
        if self.contains(&digest) {
            return Ok(digest);
        }

        atomic_write(&self.object_path(&digest), data)?;
        tracing::debug!(digest = %digest, bytes = data.len(), "stored blob");
        Ok(digest)
    }

    /// Retrieve a blob by digest.
    pub fn get_blob(&self, digest: &str) -> TwigResult<Vec<u8>> {
        if !self.contains(digest) {
            return Err(TwigError::ObjectNotFound(digest.to_string()));
        }
        Ok(fs::read(self.object_path(digest))?)
    }

    pub fn contains(&self, digest: &str) -> bool {
        is_full_digest(digest) && self.object_path(digest).exists()
    }

    /// Hash `abcdef...` lives at `ab/cdef...`.
    fn object_path(&self, digest: &str) -> PathBuf {
        let (prefix, rest) = digest.split_at(2);
        self.root.join(prefix).join(rest)
    }
}
