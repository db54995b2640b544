//! Working tree access.
//!
//! All paths handed to the engine are `/`-separated and relative to the
//! working-tree root. This module is the only place that turns them into
//! real filesystem paths.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{TwigError, TwigResult};
use crate::hash::hash_bytes;
use crate::ignore::IgnoreRules;

pub struct WorkTree {
    root: PathBuf,
    rules: IgnoreRules,
}

impl WorkTree {
    pub fn new(root: &Path, rules: IgnoreRules) -> Self {
        Self {
            root: root.to_path_buf(),
            rules,
        }
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Validate a relative path and return its absolute form.
    ///
    /// Rejects absolute paths and `..` components.
    fn validate_path(&self, rel_path: &str) -> TwigResult<PathBuf> {
        if rel_path.is_empty() || rel_path.starts_with('/') || rel_path.starts_with('\\') {
            return Err(TwigError::PathTraversal(rel_path.to_string()));
        }
        for component in Path::new(rel_path).components() {
            if !matches!(component, Component::Normal(_) | Component::CurDir) {
                return Err(TwigError::PathTraversal(rel_path.to_string()));
            }
        }
        Ok(self.root.join(rel_path))
    }

    /// Normalize a user-supplied path (`./a//b.txt` -> `a/b.txt`).
    pub fn normalize(&self, rel_path: &str) -> TwigResult<String> {
        self.validate_path(rel_path)?;
        let normalized = Path::new(rel_path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        if normalized.is_empty() {
            return Err(TwigError::PathTraversal(rel_path.to_string()));
        }
        Ok(normalized)
    }

    /// File contents, or `None` if the file is absent.
    pub fn read(&self, rel_path: &str) -> TwigResult<Option<Vec<u8>>> {
        let path = self.validate_path(rel_path)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrite (or create) a file, creating parent directories.
    pub fn write(&self, rel_path: &str, data: &[u8]) -> TwigResult<()> {
        let path = self.validate_path(rel_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(())
    }

    /// Delete a file if present, pruning directories it leaves empty.
    /// Returns whether a file was deleted.
    pub fn remove(&self, rel_path: &str) -> TwigResult<bool> {
        let path = self.validate_path(rel_path)?;
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = remove_empty_dirs(parent, &self.root) {
                tracing::warn!(path = %rel_path, error = %e, "could not prune empty directories");
            }
        }
        Ok(true)
    }

    /// Every non-ignored file in the working tree, with its digest.
    pub fn scan(&self) -> TwigResult<BTreeMap<String, String>> {
        let mut files = BTreeMap::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && self.rules.is_dir_ignored(&e.file_name().to_string_lossy()))
            })
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel_path = match entry.path().strip_prefix(&self.root) {
                Ok(p) => p
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                Err(_) => continue,
            };
            if self.rules.is_ignored(&rel_path) {
                continue;
            }

            match fs::read(entry.path()) {
                Ok(content) => {
                    files.insert(rel_path, hash_bytes(&content));
                }
                Err(e) => tracing::warn!(path = %rel_path, error = %e, "skipping unreadable file"),
            }
        }

        Ok(files)
    }
}

fn remove_empty_dirs(dir: &Path, stop_at: &Path) -> io::Result<()> {
    let mut current = dir.to_path_buf();
    while current != stop_at {
        if fs::read_dir(&current)?.next().is_none() {
            fs::remove_dir(&current)?;
        } else {
            break;
        }
        match current.parent() {
            Some(p) => current = p.to_path_buf(),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree(root: &Path) -> WorkTree {
        WorkTree::new(root, IgnoreRules::defaults())
    }

    #[test]
    fn test_write_read_remove() {
        let dir = tempdir().unwrap();
        let wt = tree(dir.path());

        wt.write("nested/dir/a.txt", b"hello").unwrap();
        assert_eq!(wt.read("nested/dir/a.txt").unwrap().unwrap(), b"hello");

        assert!(wt.remove("nested/dir/a.txt").unwrap());
        assert!(!dir.path().join("nested").exists());
        assert!(!wt.remove("nested/dir/a.txt").unwrap());
        assert!(wt.read("nested/dir/a.txt").unwrap().is_none());
    }

    #[test]
    fn test_remove_keeps_non_empty_parents() {
        let dir = tempdir().unwrap();
        let wt = tree(dir.path());
        wt.write("a/b/c.txt", b"c").unwrap();
        wt.write("a/keep.txt", b"k").unwrap();

        assert!(wt.remove("a/b/c.txt").unwrap());
        assert!(!dir.path().join("a/b").exists());
        assert!(dir.path().join("a/keep.txt").exists());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let wt = tree(dir.path());
        for bad in ["../x", "/etc/passwd", "a/../../b", ""] {
            assert!(matches!(wt.read(bad), Err(TwigError::PathTraversal(_))), "{bad}");
        }
    }

    #[test]
    fn test_normalize() {
        let dir = tempdir().unwrap();
        let wt = tree(dir.path());
        assert_eq!(wt.normalize("./a//b.txt").unwrap(), "a/b.txt");
        assert!(wt.normalize(".").is_err());
    }

    #[test]
    fn test_scan_skips_ignored() {
        let dir = tempdir().unwrap();
        let wt = tree(dir.path());
        wt.write("a.txt", b"a").unwrap();
        wt.write("src/b.txt", b"b").unwrap();
        wt.write(".twig/refs.json", b"{}").unwrap();
        wt.write("target/debug/out", b"bin").unwrap();

        let files = wt.scan().unwrap();
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["a.txt", "src/b.txt"]);
        assert_eq!(files["a.txt"], hash_bytes(b"a"));
    }
}
