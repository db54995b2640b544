//! Commit-graph ancestry: branch history and split-point search.
//!
//! The graph is a DAG whose nodes have one parent (ordinary commits),
//! two parents (merges) or none (the root).

use std::collections::{HashSet, VecDeque};

use crate::commit::CommitLookup;
use crate::config::SplitPointStrategy;
use crate::error::{TwigError, TwigResult};

/// Discovery-order history of `tip`.
///
/// Walks the first-parent chain; at each commit records the commit's own
/// digest followed by its merge parent, if any. Merge parents are
/// recorded but not walked.
pub fn history<L: CommitLookup>(commits: &L, tip: &str) -> TwigResult<Vec<String>> {
    let mut out = Vec::new();
    let mut cursor = Some(tip.to_string());
    while let Some(id) = cursor {
        let commit = commits.get_commit(&id)?;
        out.push(id);
        if let Some(merge_parent) = commit.merge_parent {
            out.push(merge_parent);
        }
        cursor = commit.parent;
    }
    Ok(out)
}

/// Every commit reachable from `tip` through either parent, `tip` included.
pub fn ancestors<L: CommitLookup>(commits: &L, tip: &str) -> TwigResult<HashSet<String>> {
    let mut seen = HashSet::new();
    let mut stack = vec![tip.to_string()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let commit = commits.get_commit(&id)?;
        stack.extend(commit.parent);
        stack.extend(commit.merge_parent);
    }
    Ok(seen)
}

/// Split point of `current` and `other`: their most recent common ancestor.
///
/// Identical tips short-circuit to that tip.
pub fn split_point<L: CommitLookup>(
    commits: &L,
    current: &str,
    other: &str,
    strategy: SplitPointStrategy,
) -> TwigResult<String> {
    if current == other {
        return Ok(current.to_string());
    }

    let found = match strategy {
        SplitPointStrategy::Linear => {
            let theirs: HashSet<String> = history(commits, other)?.into_iter().collect();
            history(commits, current)?
                .into_iter()
                .find(|id| theirs.contains(id))
        }
        SplitPointStrategy::Ancestry => nearest_common(commits, current, other)?,
    };

    let split = found.ok_or_else(|| {
        TwigError::NoCommonAncestor(current.to_string(), other.to_string())
    })?;
    tracing::debug!(current, other, split = %split, ?strategy, "split point");
    Ok(split)
}

/// The best common ancestor: a common ancestor that is not itself an
/// ancestor of another common ancestor. When several qualify (criss-cross
/// histories) the one closest to `current` in breadth-first order, first
/// parent before merge parent, wins.
fn nearest_common<L: CommitLookup>(
    commits: &L,
    current: &str,
    other: &str,
) -> TwigResult<Option<String>> {
    let ours = ancestors(commits, current)?;
    let theirs = ancestors(commits, other)?;
    let common: HashSet<&String> = ours.intersection(&theirs).collect();

    // Everything strictly behind a common ancestor is dominated by it.
    let mut dominated: HashSet<String> = HashSet::new();
    let mut stack = Vec::new();
    for id in &common {
        let commit = commits.get_commit(id)?;
        stack.extend(commit.parent);
        stack.extend(commit.merge_parent);
    }
    while let Some(id) = stack.pop() {
        if !dominated.insert(id.clone()) {
            continue;
        }
        let commit = commits.get_commit(&id)?;
        stack.extend(commit.parent);
        stack.extend(commit.merge_parent);
    }

    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([current.to_string()]);
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        if common.contains(&id) && !dominated.contains(&id) {
            return Ok(Some(id));
        }
        let commit = commits.get_commit(&id)?;
        queue.extend(commit.parent);
        queue.extend(commit.merge_parent);
    }
    Ok(None)
}
