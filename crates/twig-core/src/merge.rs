//! Three-way merge reconciliation.
//!
//! Each path is classified from three blob digests: its version at the
//! split point, in the current branch ("ours") and in the merged branch
//! ("theirs"). Absence on a side is a version of its own (`None`), so
//! deletions take part in the comparison like any other change.
//!
//! Files are compared whole; there is no line-level merging.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::commit::Commit;

/// What the merge does with one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum MergeAction {
    /// Current branch's version (or absence) stands.
    KeepOurs,
    /// Check out and stage the merged branch's blob.
    TakeTheirs { blob: String },
    /// Merged branch deleted a file we left unchanged.
    Remove,
    /// Both sides changed the file differently; write conflict markers.
    Conflict {
        ours: Option<String>,
        theirs: Option<String>,
    },
}

/// Classify one path.
///
/// A conflict exists only when all three versions differ. Otherwise: if
/// both sides agree, or only we changed the file, ours stands; if only
/// they changed it, their version (or deletion) is taken.
pub fn classify(split: Option<&str>, ours: Option<&str>, theirs: Option<&str>) -> MergeAction {
    if ours == theirs || theirs == split {
        return MergeAction::KeepOurs;
    }
    if ours == split {
        return match theirs {
            Some(blob) => MergeAction::TakeTheirs {
                blob: blob.to_string(),
            },
            None => MergeAction::Remove,
        };
    }
    MergeAction::Conflict {
        ours: ours.map(String::from),
        theirs: theirs.map(String::from),
    }
}

/// A path and what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMerge {
    pub path: String,
    #[serde(flatten)]
    pub action: MergeAction,
}

/// Classify every path known to any of the three snapshots, in
/// lexicographic order. Paths where ours stands are omitted.
pub fn plan(split: &Commit, ours: &Commit, theirs: &Commit) -> Vec<PathMerge> {
    let paths: BTreeSet<&String> = split
        .files
        .keys()
        .chain(ours.files.keys())
        .chain(theirs.files.keys())
        .collect();

    paths
        .into_iter()
        .filter_map(|path| {
            let action = classify(split.blob(path), ours.blob(path), theirs.blob(path));
            tracing::debug!(path = %path, ?action, "merge classification");
            match action {
                MergeAction::KeepOurs => None,
                action => Some(PathMerge {
                    path: path.clone(),
                    action,
                }),
            }
        })
        .collect()
}

/// Contents written to a conflicted file. A missing side renders as
/// empty text.
pub fn conflict_content(ours: Option<&[u8]>, theirs: Option<&[u8]>) -> Vec<u8> {
    let ours = ours.unwrap_or_default();
    let theirs = theirs.unwrap_or_default();
    let mut out = Vec::with_capacity(ours.len() + theirs.len() + 32);
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    out.extend_from_slice(ours);
    out.extend_from_slice(b"=======\n");
    out.extend_from_slice(theirs);
    out.extend_from_slice(b">>>>>>>\n");
    out
}

/// Message recorded on a merge commit.
pub fn merge_message(merged: &str, current: &str) -> String {
    format!("Merged {merged} into {current}.")
}
