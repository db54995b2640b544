//! Repository configuration, stored as `.twig/config.json`.
//!
//! Every field has a default, so a missing file or a partial file is
//! valid. Unknown fields are rejected to catch typos.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TwigResult;
use crate::fsutil::atomic_write;

/// How `merge` searches for the split point of two branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPointStrategy {
    /// Most recent common ancestor over the full commit graph, following
    /// both parents of merges.
    #[default]
    Ancestry,
    /// First commit of the current branch's discovery-order history that
    /// also appears in the other branch's history. Only sees second
    /// parents recorded directly on a visited commit.
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// How long a command waits for the repository lock.
    pub lock_timeout_ms: u64,
    /// Shortest abbreviated commit id accepted on the command line.
    pub min_id_prefix: usize,
    pub split_point: SplitPointStrategy,
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig {
            lock_timeout_ms: 5_000,
            min_id_prefix: 8,
            split_point: SplitPointStrategy::default(),
        }
    }
}

impl RepoConfig {
    pub fn load(path: &Path) -> TwigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> TwigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
