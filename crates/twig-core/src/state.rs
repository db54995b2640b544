//! Working-tree state detection.
//!
//! Compares the files on disk against HEAD and the staging area to build
//! the `status` report, and finds untracked files that a checkout would
//! overwrite.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::branch::BranchTable;
use crate::commit::Commit;
use crate::staging::StagingArea;

/// Why a file shows up under "Modifications Not Staged For Commit".
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Modified,
    Deleted,
}

impl FileStatus {
    pub fn label(self) -> &'static str {
        match self {
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnstagedChange {
    pub path: String,
    pub status: FileStatus,
}

/// Everything `status` reports. Every list is sorted by path or name.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub branches: Vec<BranchEntry>,
    pub staged: Vec<String>,
    pub removed: Vec<String>,
    pub unstaged: Vec<UnstagedChange>,
    pub untracked: Vec<String>,
}

impl StatusReport {
    /// True if nothing is staged and the working tree matches HEAD.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.removed.is_empty()
            && self.unstaged.is_empty()
            && self.untracked.is_empty()
    }
}

/// Build the status report.
///
/// `on_disk` maps every non-ignored working-tree path to its digest.
pub fn compute_status(
    branches: &BranchTable,
    staging: &StagingArea,
    head: &Commit,
    on_disk: &BTreeMap<String, String>,
) -> StatusReport {
    let branch_entries = branches
        .list()
        .into_iter()
        .map(|name| BranchEntry {
            name: name.to_string(),
            current: name == branches.current(),
        })
        .collect();

    let mut unstaged: BTreeMap<&str, FileStatus> = BTreeMap::new();

    for (path, head_blob) in &head.files {
        if staging.is_staged_for_addition(path) {
            continue;
        }
        match on_disk.get(path) {
            Some(disk) if disk != head_blob => {
                unstaged.insert(path, FileStatus::Modified);
            }
            None if !staging.is_staged_for_removal(path) => {
                unstaged.insert(path, FileStatus::Deleted);
            }
            _ => {}
        }
    }

    for (path, staged_blob) in staging.additions() {
        match on_disk.get(path) {
            None => {
                unstaged.insert(path, FileStatus::Deleted);
            }
            Some(disk) if disk != staged_blob => {
                unstaged.insert(path, FileStatus::Modified);
            }
            _ => {}
        }
    }

    let untracked = on_disk
        .keys()
        .filter(|path| {
            !staging.is_staged_for_addition(path)
                && (!head.tracks(path) || staging.is_staged_for_removal(path))
        })
        .cloned()
        .collect();

    StatusReport {
        branches: branch_entries,
        staged: staging.additions().keys().cloned().collect(),
        removed: staging.removals().iter().cloned().collect(),
        unstaged: unstaged
            .into_iter()
            .map(|(path, status)| UnstagedChange {
                path: path.to_string(),
                status,
            })
            .collect(),
        untracked,
    }
}

/// Untracked files that replacing HEAD's snapshot with `target` would
/// silently overwrite: present on disk, not tracked by HEAD, not staged,
/// and tracked by `target` with different content.
pub fn untracked_obstructions(
    head: &Commit,
    staging: &StagingArea,
    target: &Commit,
    on_disk: &BTreeMap<String, String>,
) -> Vec<String> {
    on_disk
        .iter()
        .filter(|(path, disk)| {
            !head.tracks(path)
                && !staging.is_staged_for_addition(path)
                && target.blob(path).is_some_and(|blob| blob != disk.as_str())
        })
        .map(|(path, _)| path.clone())
        .collect()
}
