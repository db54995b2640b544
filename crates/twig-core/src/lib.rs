//! twig-core: the engine behind the twig version control system.
//!
//! A repository is a content-addressed blob store, a store of immutable
//! commit snapshots, a table of named branches and a staging area. See
//! [`Repository`] for the commands built on top of them.

pub mod branch;
pub mod commit;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod graph;
pub mod hash;
pub mod ignore;
pub mod lock;
pub mod merge;
pub mod object;
pub mod repo;
pub mod staging;
pub mod state;
pub mod worktree;

pub use error::{TwigError, TwigResult};
pub use repo::Repository;
