//! Error types for twig operations.
//!
//! Domain failures (the ones a user can cause by running a command in the
//! wrong state) carry the exact message the CLI prints. Infrastructure
//! failures (I/O, corrupt metadata, lock contention) are kept separate so
//! the CLI can map them to a failing exit status.

use std::io;

use thiserror::Error;

/// All possible twig errors.
#[derive(Debug, Error)]
pub enum TwigError {
    #[error("A twig version-control system already exists in the current directory.")]
    AlreadyInitialized,

    #[error("Not in an initialized twig directory.")]
    NotInitialized,

    /// `add` target is missing from the working tree.
    #[error("File does not exist.")]
    FileNotFound(String),

    #[error("File does not exist in that commit.")]
    FileNotInCommit(String),

    #[error("No commit with that id exists.")]
    NoSuchCommit(String),

    /// Abbreviated id is shorter than the configured minimum or matches
    /// more than one commit.
    #[error("No unique commit matches id '{0}'.")]
    AmbiguousOrUnknownId(String),

    #[error("A branch with that name does not exist.")]
    NoSuchBranch(String),

    #[error("A branch with that name already exists.")]
    BranchExists(String),

    #[error("Cannot remove the current branch.")]
    ProtectedBranch(String),

    #[error("No need to checkout the current branch.")]
    AlreadyOnBranch(String),

    #[error("No changes added to the commit.")]
    NothingToCommit,

    #[error("Please enter a commit message.")]
    EmptyMessage,

    #[error("You have uncommitted changes.")]
    UncommittedChanges,

    #[error("Cannot merge a branch with itself.")]
    SelfMerge,

    #[error("Given branch is an ancestor of the current branch.")]
    AlreadyAncestor,

    /// The current branch was moved to the given tip; no merge commit exists.
    #[error("Current branch fast-forwarded.")]
    FastForwarded { tip: String },

    #[error("There is an untracked file in the way; delete it, or add and commit it first.")]
    UntrackedObstruction(String),

    /// The merge commit was recorded, but some paths hold conflict markers.
    #[error("Encountered a merge conflict.")]
    MergeConflict { commit: String, paths: Vec<String> },

    #[error("No reason to remove the file.")]
    NoReasonToRemove(String),

    #[error("Found no commit with that message.")]
    NoCommitWithMessage,

    #[error("No common ancestor between '{0}' and '{1}'.")]
    NoCommonAncestor(String, String),

    /// Malformed operands that the argument parser could not catch.
    #[error("{0}")]
    Usage(String),

    #[error("path escapes the working tree: {0}")]
    PathTraversal(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("corrupt repository state: {0}")]
    CorruptState(String),

    #[error("could not acquire repository lock within timeout")]
    LockTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TwigError {
    /// True for failures caused by the command and repository state rather
    /// than by the environment. These are reported as plain messages.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            TwigError::ObjectNotFound(_)
                | TwigError::CorruptState(_)
                | TwigError::LockTimeout
                | TwigError::Io(_)
                | TwigError::Json(_)
        )
    }
}

/// Convenience alias for Results in twig.
pub type TwigResult<T> = Result<T, TwigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_user_errors() {
        assert!(TwigError::NothingToCommit.is_user_error());
        assert!(TwigError::MergeConflict {
            commit: "abc".to_string(),
            paths: vec![],
        }
        .is_user_error());
        assert!(TwigError::Usage("Incorrect operands.".to_string()).is_user_error());
    }

    #[test]
    fn test_infrastructure_errors_are_not_user_errors() {
        let io = TwigError::from(io::Error::new(io::ErrorKind::Other, "disk gone"));
        assert!(!io.is_user_error());
        assert!(!TwigError::LockTimeout.is_user_error());
        assert!(!TwigError::CorruptState("refs.json".to_string()).is_user_error());
    }

    #[test]
    fn test_messages_match_command_output() {
        assert_eq!(
            TwigError::NoReasonToRemove("f".to_string()).to_string(),
            "No reason to remove the file."
        );
        assert_eq!(
            TwigError::FastForwarded {
                tip: "abc".to_string()
            }
            .to_string(),
            "Current branch fast-forwarded."
        );
    }
}
