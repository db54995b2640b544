//! Commits and the commit store.
//!
//! A commit is an immutable, complete snapshot: its file table maps every
//! tracked path to a blob digest, so reading a commit never requires
//! consulting its parents. Commits live in `.twig/commits/<digest>.json`
//! where the digest is the SHA-256 of the commit's canonical JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TwigError, TwigResult};
use crate::fsutil::atomic_write;
use crate::hash::{hash_bytes, is_full_digest};

/// Message of the root commit created by `init`.
pub const ROOT_MESSAGE: &str = "initial commit";

/// A commit snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    pub message: String,
    /// First parent. Only the root commit has none.
    pub parent: Option<String>,
    /// Tip of the merged-in branch. Present only on merge commits.
    pub merge_parent: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Full snapshot: tracked path -> blob digest.
    pub files: BTreeMap<String, String>,
}

impl Commit {
    /// The root commit. Its timestamp is the Unix epoch, so every
    /// repository starts from the same root digest.
    pub fn root() -> Self {
        Commit {
            message: ROOT_MESSAGE.to_string(),
            parent: None,
            merge_parent: None,
            timestamp: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            files: BTreeMap::new(),
        }
    }

    /// A new commit stamped with the current time.
    pub fn new(
        message: String,
        parent: String,
        merge_parent: Option<String>,
        files: BTreeMap<String, String>,
    ) -> Self {
        Commit {
            message,
            parent: Some(parent),
            merge_parent,
            timestamp: Utc::now(),
            files,
        }
    }

    pub fn is_merge(&self) -> bool {
        self.merge_parent.is_some()
    }

    /// Blob digest recorded for `path`, if tracked.
    pub fn blob(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn tracks(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Canonical serialized form. Field order is fixed by the struct and
    /// the file table is a sorted map, so equal commits give equal bytes.
    pub fn canonical_bytes(&self) -> TwigResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn digest(&self) -> TwigResult<String> {
        Ok(hash_bytes(&self.canonical_bytes()?))
    }
}

/// Read access to commits by digest.
///
/// Graph algorithms are written against this trait so they can run over
/// the on-disk store or over an in-memory map.
pub trait CommitLookup {
    fn get_commit(&self, digest: &str) -> TwigResult<Commit>;
}

impl CommitLookup for BTreeMap<String, Commit> {
    fn get_commit(&self, digest: &str) -> TwigResult<Commit> {
        self.get(digest)
            .cloned()
            .ok_or_else(|| TwigError::ObjectNotFound(digest.to_string()))
    }
}

/// On-disk commit storage.
pub struct CommitStore {
    /// Root path: `.twig/commits/`
    root: PathBuf,
}

impl CommitStore {
    pub fn new(commits_dir: &Path) -> Self {
        Self {
            root: commits_dir.to_path_buf(),
        }
    }

    /// Persist a commit and return its digest. Idempotent.
    pub fn put_commit(&self, commit: &Commit) -> TwigResult<String> {
        let bytes = commit.canonical_bytes()?;
        let digest = hash_bytes(&bytes);
        let path = self.commit_path(&digest);
        if !path.exists() {
            atomic_write(&path, &bytes)?;
        }
        Ok(digest)
    }

    pub fn contains(&self, digest: &str) -> bool {
        is_full_digest(digest) && self.commit_path(digest).exists()
    }

    /// Digests of every stored commit, sorted.
    pub fn ids(&self) -> TwigResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(id) = name.strip_suffix(".json") {
                if is_full_digest(id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Every stored commit, newest first. Ties are broken by digest so
    /// the order is stable.
    pub fn all(&self) -> TwigResult<Vec<(String, Commit)>> {
        let mut commits = self
            .ids()?
            .into_iter()
            .map(|id| self.get_commit(&id).map(|c| (id, c)))
            .collect::<TwigResult<Vec<_>>>()?;
        commits.sort_by(|(a_id, a), (b_id, b)| {
            b.timestamp.cmp(&a.timestamp).then_with(|| a_id.cmp(b_id))
        });
        Ok(commits)
    }

    /// Expand a full or abbreviated commit id.
    ///
    /// A full-length id is looked up directly. Anything shorter must be
    /// at least `min_prefix` characters and match exactly one commit.
    pub fn resolve_id(&self, id: &str, min_prefix: usize) -> TwigResult<String> {
        if is_full_digest(id) {
            return if self.contains(id) {
                Ok(id.to_string())
            } else {
                Err(TwigError::NoSuchCommit(id.to_string()))
            };
        }
        if id.len() < min_prefix {
            return Err(TwigError::AmbiguousOrUnknownId(id.to_string()));
        }

        let mut matches = self.ids()?.into_iter().filter(|full| full.starts_with(id));
        match (matches.next(), matches.next()) {
            (None, _) => Err(TwigError::NoSuchCommit(id.to_string())),
            (Some(full), None) => Ok(full),
            (Some(_), Some(_)) => Err(TwigError::AmbiguousOrUnknownId(id.to_string())),
        }
    }

    fn commit_path(&self, digest: &str) -> PathBuf {
        self.root.join(format!("{digest}.json"))
    }
}

impl CommitLookup for CommitStore {
    fn get_commit(&self, digest: &str) -> TwigResult<Commit> {
        if !self.contains(digest) {
            return Err(TwigError::ObjectNotFound(digest.to_string()));
        }
        let data = fs::read(self.commit_path(digest))?;
        Ok(serde_json::from_slice(&data)?)
    }
}
