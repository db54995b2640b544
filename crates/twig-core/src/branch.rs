//! Branch table: named commit pointers plus the current-branch marker.
//!
//! Stored as `.twig/refs.json`. HEAD is not stored separately: it is
//! always the tip of the current branch, so the two cannot drift apart.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TwigError, TwigResult};
use crate::fsutil::atomic_write;

/// Name of the branch created by `init`.
pub const DEFAULT_BRANCH: &str = "master";

/// All branches and which one is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchTable {
    current: String,
    /// Branch name -> tip commit digest.
    tips: BTreeMap<String, String>,
}

impl BranchTable {
    /// A table holding a single current branch at `tip`.
    pub fn new(name: &str, tip: String) -> Self {
        let mut tips = BTreeMap::new();
        tips.insert(name.to_string(), tip);
        BranchTable {
            current: name.to_string(),
            tips,
        }
    }

    pub fn load(path: &Path) -> TwigResult<Self> {
        let data = fs::read_to_string(path)?;
        let table: BranchTable = serde_json::from_str(&data)?;
        if !table.tips.contains_key(&table.current) {
            return Err(TwigError::CorruptState(format!(
                "current branch '{}' has no tip",
                table.current
            )));
        }
        Ok(table)
    }

    /// Save atomically (temp + fsync + rename).
    pub fn save(&self, path: &Path) -> TwigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        atomic_write(path, json.as_bytes())
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Digest of the commit HEAD points at.
    pub fn head(&self) -> &str {
        // `current` is always a key of `tips`; every mutation preserves it.
        self.tips.get(&self.current).map(String::as_str).unwrap_or_default()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.tips.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> TwigResult<&str> {
        self.tips
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TwigError::NoSuchBranch(name.to_string()))
    }

    /// Branch names in lexicographic order.
    pub fn list(&self) -> Vec<&str> {
        self.tips.keys().map(String::as_str).collect()
    }

    pub fn create_branch(&mut self, name: &str, at: &str) -> TwigResult<()> {
        validate_branch_name(name)?;
        if self.exists(name) {
            return Err(TwigError::BranchExists(name.to_string()));
        }
        self.tips.insert(name.to_string(), at.to_string());
        Ok(())
    }

    pub fn delete_branch(&mut self, name: &str) -> TwigResult<()> {
        if !self.exists(name) {
            return Err(TwigError::NoSuchBranch(name.to_string()));
        }
        if name == self.current {
            return Err(TwigError::ProtectedBranch(name.to_string()));
        }
        self.tips.remove(name);
        Ok(())
    }

    pub fn set_current(&mut self, name: &str) -> TwigResult<()> {
        if !self.exists(name) {
            return Err(TwigError::NoSuchBranch(name.to_string()));
        }
        self.current = name.to_string();
        Ok(())
    }

    /// Move the current branch (and so HEAD) to `tip`.
    pub fn advance_current(&mut self, tip: &str) {
        self.tips.insert(self.current.clone(), tip.to_string());
    }
}

/// Branch names become user-facing handles; keep them to one plain token.
fn validate_branch_name(name: &str) -> TwigResult<()> {
    if name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(TwigError::Usage(format!("Invalid branch name: '{name}'.")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table() -> BranchTable {
        BranchTable::new(DEFAULT_BRANCH, "root".to_string())
    }

    #[test]
    fn test_new_table_has_current_master() {
        let t = table();
        assert_eq!(t.current(), "master");
        assert_eq!(t.head(), "root");
        assert_eq!(t.list(), vec!["master"]);
    }

    #[test]
    fn test_create_and_resolve() {
        let mut t = table();
        t.create_branch("feat", "abc").unwrap();
        assert_eq!(t.resolve("feat").unwrap(), "abc");
        assert_eq!(t.current(), "master");
        assert!(matches!(
            t.create_branch("feat", "def"),
            Err(TwigError::BranchExists(_))
        ));
    }

    #[test]
    fn test_list_is_lexicographic() {
        let mut t = table();
        t.create_branch("zeta", "a").unwrap();
        t.create_branch("alpha", "a").unwrap();
        assert_eq!(t.list(), vec!["alpha", "master", "zeta"]);
    }

    #[test]
    fn test_delete_rules() {
        let mut t = table();
        t.create_branch("feat", "abc").unwrap();
        assert!(matches!(
            t.delete_branch("master"),
            Err(TwigError::ProtectedBranch(_))
        ));
        assert!(matches!(
            t.delete_branch("ghost"),
            Err(TwigError::NoSuchBranch(_))
        ));
        t.delete_branch("feat").unwrap();
        assert!(!t.exists("feat"));
    }

    #[test]
    fn test_switch_and_advance() {
        let mut t = table();
        t.create_branch("feat", "abc").unwrap();
        t.set_current("feat").unwrap();
        assert_eq!(t.head(), "abc");

        t.advance_current("def");
        assert_eq!(t.resolve("feat").unwrap(), "def");
        assert_eq!(t.resolve("master").unwrap(), "root");
        assert!(t.set_current("ghost").is_err());
        assert_eq!(t.current(), "feat");
    }

    #[test]
    fn test_invalid_names() {
        let mut t = table();
        for bad in ["", "a b", "../x", "a/b", "tab\there"] {
            assert!(matches!(t.create_branch(bad, "x"), Err(TwigError::Usage(_))));
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.json");
        let mut t = table();
        t.create_branch("feat", "abc").unwrap();
        t.save(&path).unwrap();
        assert_eq!(BranchTable::load(&path).unwrap(), t);
    }

    #[test]
    fn test_load_rejects_dangling_current() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.json");
        fs::write(&path, r#"{"current":"gone","tips":{"master":"x"}}"#).unwrap();
        assert!(matches!(
            BranchTable::load(&path),
            Err(TwigError::CorruptState(_))
        ));
    }
}
