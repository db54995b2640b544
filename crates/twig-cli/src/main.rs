//! twig CLI: the command-line interface to a twig repository.

use std::path::Path;
use std::process;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use twig_core::hash::short;
use twig_core::repo::LogEntry;
use twig_core::state::StatusReport;
use twig_core::{Repository, TwigError};

#[derive(Parser)]
#[command(name = "twig", about = "twig: a small local version control system", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new repository in the current directory.
    Init,

    /// Stage a file's current contents for the next commit.
    Add {
        /// Path relative to the repository root.
        path: String,
    },

    /// Record the staged changes as a new commit.
    Commit {
        /// Commit message.
        message: String,
    },

    /// Unstage a file, and stage its removal if it is tracked.
    Rm {
        path: String,
    },

    /// Show the current branch's history.
    Log {
        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Show every commit ever made.
    GlobalLog,

    /// Print the ids of all commits with the given message.
    Find {
        message: String,
    },

    /// Show branches, staged changes and working-tree changes.
    Status {
        /// Output format: "human" (default) or "json".
        #[arg(long, default_value = "human")]
        format: String,
    },

    /// Restore files or switch branches.
    ///
    /// `checkout -- <file>` restores a file from HEAD,
    /// `checkout <commit> -- <file>` restores it from a commit, and
    /// `checkout <branch>` switches branches.
    Checkout {
        /// Branch name, or commit id when a file follows `--`.
        target: Option<String>,

        /// File to restore.
        #[arg(last = true)]
        file: Option<String>,
    },

    /// Create a branch at the current commit.
    Branch {
        name: String,
    },

    /// Delete a branch (its commits are kept).
    RmBranch {
        name: String,
    },

    /// Move the current branch to a commit and check it out.
    Reset {
        /// Commit id (full or abbreviated).
        commit: String,
    },

    /// Merge a branch into the current branch.
    Merge {
        branch: String,
    },
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("error: cannot determine current directory: {e}");
        process::exit(1);
    });

    let result = match cli.command {
        Commands::Init => cmd_init(&cwd),
        Commands::Add { path } => cmd_add(&cwd, &path),
        Commands::Commit { message } => cmd_commit(&cwd, &message),
        Commands::Rm { path } => cmd_rm(&cwd, &path),
        Commands::Log { format } => cmd_log(&cwd, &format),
        Commands::GlobalLog => cmd_global_log(&cwd),
        Commands::Find { message } => cmd_find(&cwd, &message),
        Commands::Status { format } => cmd_status(&cwd, &format),
        Commands::Checkout { target, file } => cmd_checkout(&cwd, target, file),
        Commands::Branch { name } => cmd_branch(&cwd, &name),
        Commands::RmBranch { name } => cmd_rm_branch(&cwd, &name),
        Commands::Reset { commit } => cmd_reset(&cwd, &commit),
        Commands::Merge { branch } => cmd_merge(&cwd, &branch),
    };

    if let Err(e) = result {
        match e.downcast_ref::<TwigError>() {
            // Domain failures are ordinary outcomes: print the message only.
            Some(err) if err.is_user_error() => println!("{err}"),
            _ => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }
}

/// Log to stderr, filtered by `TWIG_LOG` (defaults to warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TWIG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn cmd_init(cwd: &Path) -> CmdResult {
    Repository::init(cwd)?;
    Ok(())
}

fn cmd_add(cwd: &Path, path: &str) -> CmdResult {
    Repository::open(cwd)?.add(path)?;
    Ok(())
}

fn cmd_commit(cwd: &Path, message: &str) -> CmdResult {
    Repository::open(cwd)?.commit(message)?;
    Ok(())
}

fn cmd_rm(cwd: &Path, path: &str) -> CmdResult {
    Repository::open(cwd)?.rm(path)?;
    Ok(())
}

fn cmd_log(cwd: &Path, format: &str) -> CmdResult {
    let repo = Repository::open(cwd)?;
    let entries = repo.log()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => print_entries(&entries),
    }
    Ok(())
}

fn cmd_global_log(cwd: &Path) -> CmdResult {
    let repo = Repository::open(cwd)?;
    print_entries(&repo.global_log()?);
    Ok(())
}

fn print_entries(entries: &[LogEntry]) {
    for entry in entries {
        println!("===");
        println!("commit {}", entry.id);
        if let (Some(parent), Some(merge_parent)) =
            (&entry.commit.parent, &entry.commit.merge_parent)
        {
            println!("Merge: {} {}", short(parent, 7), short(merge_parent, 7));
        }
        println!(
            "Date: {}",
            entry
                .commit
                .timestamp
                .with_timezone(&Local)
                .format("%a %b %-d %H:%M:%S %Y %z")
        );
        println!("{}", entry.commit.message);
        println!();
    }
}

fn cmd_find(cwd: &Path, message: &str) -> CmdResult {
    let repo = Repository::open(cwd)?;
    for id in repo.find(message)? {
        println!("{id}");
    }
    Ok(())
}

fn cmd_status(cwd: &Path, format: &str) -> CmdResult {
    let repo = Repository::open(cwd)?;
    let report = repo.status()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_status(&report),
    }
    Ok(())
}

fn print_status(report: &StatusReport) {
    println!("=== Branches ===");
    for branch in &report.branches {
        let marker = if branch.current { "*" } else { "" };
        println!("{marker}{}", branch.name);
    }
    println!();

    println!("=== Staged Files ===");
    for path in &report.staged {
        println!("{path}");
    }
    println!();

    println!("=== Removed Files ===");
    for path in &report.removed {
        println!("{path}");
    }
    println!();

    println!("=== Modifications Not Staged For Commit ===");
    for change in &report.unstaged {
        println!("{} ({})", change.path, change.status.label());
    }
    println!();

    println!("=== Untracked Files ===");
    for path in &report.untracked {
        println!("{path}");
    }
    println!();
}

fn cmd_checkout(cwd: &Path, target: Option<String>, file: Option<String>) -> CmdResult {
    let repo = Repository::open(cwd)?;
    match (target, file) {
        (None, Some(file)) => repo.checkout_file(&file)?,
        (Some(commit), Some(file)) => repo.checkout_file_from(&commit, &file)?,
        (Some(branch), None) => repo.checkout_branch(&branch)?,
        (None, None) => return Err(TwigError::Usage("Incorrect operands.".to_string()).into()),
    }
    Ok(())
}

fn cmd_branch(cwd: &Path, name: &str) -> CmdResult {
    Repository::open(cwd)?.branch(name)?;
    Ok(())
}

fn cmd_rm_branch(cwd: &Path, name: &str) -> CmdResult {
    Repository::open(cwd)?.rm_branch(name)?;
    Ok(())
}

fn cmd_reset(cwd: &Path, commit: &str) -> CmdResult {
    Repository::open(cwd)?.reset(commit)?;
    Ok(())
}

fn cmd_merge(cwd: &Path, branch: &str) -> CmdResult {
    Repository::open(cwd)?.merge(branch)?;
    Ok(())
}
