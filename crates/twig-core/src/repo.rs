//! Repository: the main entry point for twig operations.
//!
//! A Repository ties together the blob store, commit store, branch table,
//! staging area and working tree. Every mutating command follows the same
//! discipline: take the repository lock, load a [`RepositoryState`], check
//! every precondition, mutate, then persist the state once. A command that
//! fails before the end persists nothing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::branch::{BranchTable, DEFAULT_BRANCH};
use crate::commit::{Commit, CommitLookup, CommitStore};
use crate::config::RepoConfig;
use crate::error::{TwigError, TwigResult};
use crate::graph;
use crate::ignore::{IgnoreRules, IGNORE_FILE};
use crate::lock::RepoLock;
use crate::merge::{self, MergeAction, PathMerge};
use crate::object::ObjectStore;
use crate::staging::StagingArea;
use crate::state::{self, StatusReport};
use crate::worktree::WorkTree;

/// The `.twig` directory name.
pub const TWIG_DIR: &str = ".twig";

const REFS_FILE: &str = "refs.json";
const INDEX_FILE: &str = "index.json";
const CONFIG_FILE: &str = "config.json";

/// A twig repository.
pub struct Repository {
    /// Path to the `.twig/` directory.
    twig_dir: PathBuf,
    objects: ObjectStore,
    commits: CommitStore,
    worktree: WorkTree,
    config: RepoConfig,
}

/// The mutable metadata a command works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryState {
    pub branches: BranchTable,
    pub staging: StagingArea,
}

impl RepositoryState {
    /// Digest of the commit HEAD points at.
    pub fn head_id(&self) -> &str {
        self.branches.head()
    }
}

/// A commit together with its digest.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(flatten)]
    pub commit: Commit,
}

/// Result of a merge that produced a merge commit.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub commit: String,
    pub split_point: String,
    /// Every path the merge touched, in path order.
    pub changes: Vec<PathMerge>,
}

impl MergeReport {
    pub fn conflicts(&self) -> Vec<String> {
        self.changes
            .iter()
            .filter(|c| matches!(c.action, MergeAction::Conflict { .. }))
            .map(|c| c.path.clone())
            .collect()
    }
}

enum MergeOutcome {
    FastForwarded { tip: String },
    Merged(MergeReport),
}

impl Repository {
    /// Initialize a new repository in `root`: the root commit on branch
    /// `master`, an empty staging area and default configuration.
    pub fn init(root: &Path) -> TwigResult<Self> {
        let twig_dir = root.join(TWIG_DIR);

        if twig_dir.exists() {
            return Err(TwigError::AlreadyInitialized);
        }

        fs::create_dir_all(twig_dir.join("objects"))?;
        fs::create_dir_all(twig_dir.join("commits"))?;

        let commits = CommitStore::new(&twig_dir.join("commits"));
        let root_id = commits.put_commit(&Commit::root())?;

        RepoConfig::default().save(&twig_dir.join(CONFIG_FILE))?;
        StagingArea::default().save(&twig_dir.join(INDEX_FILE))?;
        BranchTable::new(DEFAULT_BRANCH, root_id.clone()).save(&twig_dir.join(REFS_FILE))?;

        tracing::info!(root = %root.display(), commit = %root_id, "initialized repository");
        Self::open(root)
    }

    /// Open an existing repository rooted at `root`.
    pub fn open(root: &Path) -> TwigResult<Self> {
        let twig_dir = root.join(TWIG_DIR);

        if !twig_dir.join(REFS_FILE).exists() {
            return Err(TwigError::NotInitialized);
        }

        let config = RepoConfig::load(&twig_dir.join(CONFIG_FILE))?;

        Ok(Self {
            objects: ObjectStore::new(&twig_dir.join("objects")),
            commits: CommitStore::new(&twig_dir.join("commits")),
            worktree: WorkTree::new(root, IgnoreRules::load(root)),
            config,
            twig_dir,
        })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    // --- State plumbing ---

    fn lock(&self) -> TwigResult<RepoLock> {
        RepoLock::acquire(&self.twig_dir, self.config.lock_timeout())
    }

    /// Load the branch table and staging area.
    pub fn load_state(&self) -> TwigResult<RepositoryState> {
        Ok(RepositoryState {
            branches: BranchTable::load(&self.twig_dir.join(REFS_FILE))?,
            staging: StagingArea::load(&self.twig_dir.join(INDEX_FILE))?,
        })
    }

    fn save_state(&self, state: &RepositoryState) -> TwigResult<()> {
        state.staging.save(&self.twig_dir.join(INDEX_FILE))?;
        state.branches.save(&self.twig_dir.join(REFS_FILE))
    }

    /// Run `op` under the lock against freshly loaded state; persist the
    /// state only if `op` succeeds.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut RepositoryState) -> TwigResult<T>,
    ) -> TwigResult<T> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        let out = op(&mut state)?;
        self.save_state(&state)?;
        Ok(out)
    }

    fn head_commit(&self, state: &RepositoryState) -> TwigResult<Commit> {
        self.commits.get_commit(state.head_id())
    }

    /// HEAD's digest and commit.
    pub fn head(&self) -> TwigResult<LogEntry> {
        let state = self.load_state()?;
        Ok(LogEntry {
            id: state.head_id().to_string(),
            commit: self.head_commit(&state)?,
        })
    }

    pub fn current_branch(&self) -> TwigResult<String> {
        Ok(self.load_state()?.branches.current().to_string())
    }

    fn resolve_commit_id(&self, id: &str) -> TwigResult<String> {
        self.commits.resolve_id(id, self.config.min_id_prefix)
    }

    // --- Staging ---

    /// Stage the working-tree contents of `path`.
    ///
    /// Returns whether the path is staged for addition afterwards; content
    /// identical to HEAD's is not staged.
    pub fn add(&self, path: &str) -> TwigResult<bool> {
        let path = self.worktree.normalize(path)?;
        if self.worktree.rules().is_ignored(&path) {
            return Err(TwigError::Usage(format!(
                "{path} is ignored by {IGNORE_FILE}."
            )));
        }
        self.mutate(|state| {
            let head = self.head_commit(state)?;
            self.stage_from_worktree(state, &path, &head)
        })
    }

    fn stage_from_worktree(
        &self,
        state: &mut RepositoryState,
        path: &str,
        head: &Commit,
    ) -> TwigResult<bool> {
        let data = self
            .worktree
            .read(path)?
            .ok_or_else(|| TwigError::FileNotFound(path.to_string()))?;
        let digest = self.objects.put_blob(&data)?;
        let staged = state.staging.stage_addition(path, digest, head.blob(path));
        tracing::debug!(path, staged, "add");
        Ok(staged)
    }

    /// Unstage `path` if staged for addition; if HEAD tracks it, stage it
    /// for removal and delete it from the working tree.
    pub fn rm(&self, path: &str) -> TwigResult<()> {
        let path = self.worktree.normalize(path)?;
        self.mutate(|state| {
            let head = self.head_commit(state)?;
            let was_staged = state.staging.unstage_addition(&path);
            let tracked = head.tracks(&path);
            if !was_staged && !tracked {
                return Err(TwigError::NoReasonToRemove(path.clone()));
            }
            if tracked {
                state.staging.stage_removal(&path);
                self.worktree.remove(&path)?;
            }
            Ok(())
        })
    }

    // --- Commits ---

    /// Commit the staging area on top of HEAD. Returns the new digest.
    pub fn commit(&self, message: &str) -> TwigResult<String> {
        if message.trim().is_empty() {
            return Err(TwigError::EmptyMessage);
        }
        self.mutate(|state| self.commit_staged(state, message.to_string(), None))
    }

    /// Build a commit from HEAD's snapshot plus the staging area, advance
    /// the current branch to it and clear the staging area. An empty
    /// staging area is allowed only for merge commits.
    fn commit_staged(
        &self,
        state: &mut RepositoryState,
        message: String,
        merge_parent: Option<String>,
    ) -> TwigResult<String> {
        if state.staging.is_empty() && merge_parent.is_none() {
            return Err(TwigError::NothingToCommit);
        }

        let head = self.head_commit(state)?;
        let mut files = head.files;
        state.staging.apply_to(&mut files);

        let commit = Commit::new(message, state.head_id().to_string(), merge_parent, files);
        let id = self.commits.put_commit(&commit)?;
        state.branches.advance_current(&id);
        state.staging.clear();

        tracing::info!(
            commit = %id,
            branch = state.branches.current(),
            files = commit.files.len(),
            merge = commit.is_merge(),
            "committed"
        );
        Ok(id)
    }

    /// First-parent history from HEAD, newest first.
    pub fn log(&self) -> TwigResult<Vec<LogEntry>> {
        let state = self.load_state()?;
        let mut entries = Vec::new();
        let mut cursor = Some(state.head_id().to_string());

        while let Some(id) = cursor {
            let commit = self.commits.get_commit(&id)?;
            cursor = commit.parent.clone();
            entries.push(LogEntry { id, commit });
        }

        Ok(entries)
    }

    /// Every commit ever made, newest first.
    pub fn global_log(&self) -> TwigResult<Vec<LogEntry>> {
        Ok(self
            .commits
            .all()?
            .into_iter()
            .map(|(id, commit)| LogEntry { id, commit })
            .collect())
    }

    /// Digests of all commits whose message is exactly `message`.
    pub fn find(&self, message: &str) -> TwigResult<Vec<String>> {
        let ids: Vec<String> = self
            .commits
            .all()?
            .into_iter()
            .filter(|(_, commit)| commit.message == message)
            .map(|(id, _)| id)
            .collect();
        if ids.is_empty() {
            return Err(TwigError::NoCommitWithMessage);
        }
        Ok(ids)
    }

    pub fn status(&self) -> TwigResult<StatusReport> {
        let state = self.load_state()?;
        let head = self.head_commit(&state)?;
        let on_disk = self.worktree.scan()?;
        Ok(state::compute_status(
            &state.branches,
            &state.staging,
            &head,
            &on_disk,
        ))
    }

    // --- Branches ---

    /// Create a branch at HEAD. Does not switch to it.
    pub fn branch(&self, name: &str) -> TwigResult<()> {
        self.mutate(|state| {
            let head = state.head_id().to_string();
            state.branches.create_branch(name, &head)?;
            tracing::info!(branch = name, at = %head, "created branch");
            Ok(())
        })
    }

    pub fn rm_branch(&self, name: &str) -> TwigResult<()> {
        self.mutate(|state| {
            state.branches.delete_branch(name)?;
            tracing::info!(branch = name, "deleted branch");
            Ok(())
        })
    }

    // --- Checkout / reset ---

    /// Restore `path` from HEAD. Staging is untouched.
    pub fn checkout_file(&self, path: &str) -> TwigResult<()> {
        let _lock = self.lock()?;
        let state = self.load_state()?;
        let head = self.head_commit(&state)?;
        self.restore_file(&head, path)
    }

    /// Restore `path` from the commit named by a full or abbreviated id.
    pub fn checkout_file_from(&self, commit_id: &str, path: &str) -> TwigResult<()> {
        let _lock = self.lock()?;
        let id = self.resolve_commit_id(commit_id)?;
        let commit = self.commits.get_commit(&id)?;
        self.restore_file(&commit, path)
    }

    fn restore_file(&self, commit: &Commit, path: &str) -> TwigResult<()> {
        let path = self.worktree.normalize(path)?;
        let blob = commit
            .blob(&path)
            .ok_or_else(|| TwigError::FileNotInCommit(path.clone()))?;
        let data = self.objects.get_blob(blob)?;
        self.worktree.write(&path, &data)
    }

    /// Switch to another branch, replacing the working tree with its tip.
    pub fn checkout_branch(&self, name: &str) -> TwigResult<()> {
        self.mutate(|state| {
            state.branches.resolve(name)?;
            if name == state.branches.current() {
                return Err(TwigError::AlreadyOnBranch(name.to_string()));
            }
            self.switch_branch(state, name)
        })
    }

    /// Shared by `checkout <branch>` and fast-forward merges.
    fn switch_branch(&self, state: &mut RepositoryState, name: &str) -> TwigResult<()> {
        let head = self.head_commit(state)?;
        let target_id = state.branches.resolve(name)?.to_string();
        let target = self.commits.get_commit(&target_id)?;

        self.check_obstructions(state, &head, &target)?;
        self.replace_tree(&head, &target)?;

        state.branches.set_current(name)?;
        state.staging.clear();
        tracing::info!(branch = name, head = %target_id, "switched branch");
        Ok(())
    }

    /// Move the current branch to `commit_id`, replacing the working tree
    /// with that commit's snapshot and clearing the staging area.
    pub fn reset(&self, commit_id: &str) -> TwigResult<String> {
        self.mutate(|state| {
            let id = self.resolve_commit_id(commit_id)?;
            let head = self.head_commit(state)?;
            let target = self.commits.get_commit(&id)?;

            self.check_obstructions(state, &head, &target)?;
            self.replace_tree(&head, &target)?;

            state.branches.advance_current(&id);
            state.staging.clear();
            tracing::info!(branch = state.branches.current(), head = %id, "reset");
            Ok(id)
        })
    }

    fn check_obstructions(
        &self,
        state: &RepositoryState,
        head: &Commit,
        target: &Commit,
    ) -> TwigResult<()> {
        let on_disk = self.worktree.scan()?;
        let blocked = state::untracked_obstructions(head, &state.staging, target, &on_disk);
        match blocked.into_iter().next() {
            Some(path) => Err(TwigError::UntrackedObstruction(path)),
            None => Ok(()),
        }
    }

    /// Make the working tree hold `target`'s snapshot: delete files only
    /// `head` tracks, write every file `target` tracks. All blobs are read
    /// before the first file is touched.
    fn replace_tree(&self, head: &Commit, target: &Commit) -> TwigResult<()> {
        let contents = target
            .files
            .iter()
            .map(|(path, blob)| Ok((path.as_str(), self.objects.get_blob(blob)?)))
            .collect::<TwigResult<Vec<_>>>()?;

        for path in head.files.keys().filter(|p| !target.tracks(p)) {
            self.worktree.remove(path)?;
        }
        for (path, data) in contents {
            self.worktree.write(path, &data)?;
        }
        Ok(())
    }

    // --- Merge ---

    /// Merge `branch` into the current branch.
    ///
    /// A merge commit is recorded even when some paths conflict; that case
    /// is reported as `MergeConflict` after the commit is persisted. When
    /// the current branch is behind `branch`, the merge becomes a checkout
    /// of `branch` and is reported as `FastForwarded`.
    pub fn merge(&self, branch: &str) -> TwigResult<MergeReport> {
        match self.mutate(|state| self.merge_into(state, branch))? {
            MergeOutcome::FastForwarded { tip } => Err(TwigError::FastForwarded { tip }),
            MergeOutcome::Merged(report) => {
                let paths = report.conflicts();
                if paths.is_empty() {
                    Ok(report)
                } else {
                    Err(TwigError::MergeConflict {
                        commit: report.commit,
                        paths,
                    })
                }
            }
        }
    }

    fn merge_into(&self, state: &mut RepositoryState, branch: &str) -> TwigResult<MergeOutcome> {
        let their_id = state.branches.resolve(branch)?.to_string();
        if !state.staging.is_empty() {
            return Err(TwigError::UncommittedChanges);
        }
        let current = state.branches.current().to_string();
        if branch == current {
            return Err(TwigError::SelfMerge);
        }

        let our_id = state.head_id().to_string();
        let ours = self.commits.get_commit(&our_id)?;
        let theirs = self.commits.get_commit(&their_id)?;
        self.check_obstructions(state, &ours, &theirs)?;

        let split_id =
            graph::split_point(&self.commits, &our_id, &their_id, self.config.split_point)?;
        if split_id == their_id {
            return Err(TwigError::AlreadyAncestor);
        }
        if split_id == our_id {
            self.switch_branch(state, branch)?;
            tracing::info!(branch, tip = %their_id, "fast-forwarded");
            return Ok(MergeOutcome::FastForwarded { tip: their_id });
        }

        let split = self.commits.get_commit(&split_id)?;
        let changes = merge::plan(&split, &ours, &theirs);

        // Read every blob the merge needs before touching the tree.
        let mut writes: Vec<(&str, Vec<u8>)> = Vec::new();
        let mut deletes: Vec<&str> = Vec::new();
        for change in &changes {
            let path = change.path.as_str();
            match &change.action {
                MergeAction::KeepOurs => {}
                MergeAction::TakeTheirs { blob } => {
                    writes.push((path, self.objects.get_blob(blob)?));
                    state.staging.stage_addition(path, blob.clone(), ours.blob(path));
                }
                MergeAction::Remove => {
                    deletes.push(path);
                    state.staging.stage_removal(path);
                }
                MergeAction::Conflict {
                    ours: our_blob,
                    theirs: their_blob,
                } => {
                    let our_data = our_blob.as_deref().map(|b| self.objects.get_blob(b)).transpose()?;
                    let their_data =
                        their_blob.as_deref().map(|b| self.objects.get_blob(b)).transpose()?;
                    let content = merge::conflict_content(our_data.as_deref(), their_data.as_deref());
                    let digest = self.objects.put_blob(&content)?;
                    state.staging.stage_addition(path, digest, ours.blob(path));
                    writes.push((path, content));
                    tracing::warn!(path, "merge conflict");
                }
            }
        }

        for path in deletes {
            self.worktree.remove(path)?;
        }
        for (path, data) in &writes {
            self.worktree.write(path, data)?;
        }

        let commit = self.commit_staged(
            state,
            merge::merge_message(branch, &current),
            Some(their_id.clone()),
        )?;
        tracing::info!(branch, into = %current, commit = %commit, "merged");

        Ok(MergeOutcome::Merged(MergeReport {
            commit,
            split_point: split_id,
            changes,
        }))
    }
}
