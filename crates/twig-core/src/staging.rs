//! Staging area.
//!
//! Pending additions (path -> blob digest) and pending removals (paths),
//! applied by the next commit. Stored as `.twig/index.json`. A path is
//! never staged for addition and removal at the same time.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TwigResult;
use crate::fsutil::atomic_write;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingArea {
    additions: BTreeMap<String, String>,
    removals: BTreeSet<String>,
}

impl StagingArea {
    /// Load the staging area, or return an empty one if none is saved.
    pub fn load(path: &Path) -> TwigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save atomically (temp + fsync + rename).
    pub fn save(&self, path: &Path) -> TwigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    pub fn additions(&self) -> &BTreeMap<String, String> {
        &self.additions
    }

    pub fn removals(&self) -> &BTreeSet<String> {
        &self.removals
    }

    pub fn staged_blob(&self, path: &str) -> Option<&str> {
        self.additions.get(path).map(String::as_str)
    }

    pub fn is_staged_for_addition(&self, path: &str) -> bool {
        self.additions.contains_key(path)
    }

    pub fn is_staged_for_removal(&self, path: &str) -> bool {
        self.removals.contains(path)
    }

    /// Record a candidate blob for `path` against what HEAD tracks.
    ///
    /// Content identical to HEAD's is never staged, and drops any earlier
    /// addition entry for the path. Anything else replaces the entry.
    /// Returns whether the path ends up staged for addition.
    pub fn stage_addition(&mut self, path: &str, digest: String, head_blob: Option<&str>) -> bool {
        self.removals.remove(path);

        if head_blob == Some(digest.as_str()) {
            tracing::debug!(path, "content matches HEAD; not staging");
            self.additions.remove(path);
            return false;
        }

        self.additions.insert(path.to_string(), digest);
        true
    }

    /// Drop a pending addition. Returns whether one existed.
    pub fn unstage_addition(&mut self, path: &str) -> bool {
        self.additions.remove(path).is_some()
    }

    pub fn stage_removal(&mut self, path: &str) {
        self.additions.remove(path);
        self.removals.insert(path.to_string());
    }

    /// Apply pending changes to a parent snapshot: drop removals, then
    /// overlay additions.
    pub fn apply_to(&self, files: &mut BTreeMap<String, String>) {
        for path in &self.removals {
            files.remove(path);
        }
        for (path, digest) in &self.additions {
            files.insert(path.clone(), digest.clone());
        }
    }

    pub fn clear(&mut self) {
        self.additions.clear();
        self.removals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_staging() {
        let s = StagingArea::default();
        assert!(s.is_empty());
        assert!(!s.is_staged_for_addition("foo.rs"));
    }

    #[test]
    fn test_stage_new_path() {
        let mut s = StagingArea::default();
        assert!(s.stage_addition("a.txt", "h1".to_string(), None));
        assert_eq!(s.staged_blob("a.txt"), Some("h1"));
    }

    #[test]
    fn test_identical_to_head_is_not_staged() {
        let mut s = StagingArea::default();
        assert!(!s.stage_addition("a.txt", "h1".to_string(), Some("h1")));
        assert!(s.is_empty());
    }

    #[test]
    fn test_restaging_overwrites() {
        let mut s = StagingArea::default();
        s.stage_addition("a.txt", "h2".to_string(), Some("h1"));
        assert!(s.stage_addition("a.txt", "h3".to_string(), Some("h1")));
        assert_eq!(s.staged_blob("a.txt"), Some("h3"));
    }

    #[test]
    fn test_restaging_head_content_unstages() {
        let mut s = StagingArea::default();
        s.stage_addition("a.txt", "h2".to_string(), Some("h1"));
        assert!(!s.stage_addition("a.txt", "h1".to_string(), Some("h1")));
        assert!(!s.is_staged_for_addition("a.txt"));
        assert!(s.is_empty());
    }

    #[test]
    fn test_addition_cancels_removal() {
        let mut s = StagingArea::default();
        s.stage_removal("a.txt");
        assert!(s.is_staged_for_removal("a.txt"));

        s.stage_addition("a.txt", "h1".to_string(), Some("h1"));
        assert!(!s.is_staged_for_removal("a.txt"));
        assert!(s.is_empty());
    }

    #[test]
    fn test_removal_cancels_addition() {
        let mut s = StagingArea::default();
        s.stage_addition("a.txt", "h2".to_string(), Some("h1"));
        s.stage_removal("a.txt");
        assert!(!s.is_staged_for_addition("a.txt"));
        assert!(s.is_staged_for_removal("a.txt"));
    }

    #[test]
    fn test_apply_to_snapshot() {
        let mut files = BTreeMap::new();
        files.insert("keep".to_string(), "k".to_string());
        files.insert("gone".to_string(), "g".to_string());
        files.insert("edit".to_string(), "e1".to_string());

        let mut s = StagingArea::default();
        s.stage_removal("gone");
        s.stage_addition("edit", "e2".to_string(), Some("e1"));
        s.stage_addition("new", "n".to_string(), None);
        s.apply_to(&mut files);

        assert_eq!(files.len(), 3);
        assert_eq!(files["keep"], "k");
        assert_eq!(files["edit"], "e2");
        assert_eq!(files["new"], "n");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut s = StagingArea::default();
        s.stage_addition("file.txt", "hash123".to_string(), None);
        s.stage_removal("old.txt");
        s.save(&path).unwrap();

        assert_eq!(StagingArea::load(&path).unwrap(), s);
        assert!(StagingArea::load(&dir.path().join("missing.json"))
            .unwrap()
            .is_empty());
    }
}
