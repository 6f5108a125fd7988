//! ngh CLI
//!
//! Mirrors GitHub repositories into local directories without a local Git
//! installation.
//!
//! # Commands
//!
//! - `new` / `destroy` - Create or delete a repository on GitHub
//! - `clone` / `link` / `unlink` - Attach a directory to a repository
//! - `status` - Show local changes and the state of the remote branch
//! - `pull` / `commit` / `reset` - Synchronize files
//! - `branches` / `branch` / `merge` - Manage remote branches

mod client;
mod commands;
mod config;
mod prompt;

use clap::{Args, Parser, Subcommand};
use ngh_core::PullStrategy;
use ngh_sync_engine::SyncError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mirror GitHub repositories without Git.
#[derive(Parser)]
#[command(name = "ngh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path inside the local repository (defaults to the current directory)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How conflicts found while pulling are settled.
#[derive(Args, Clone, Copy)]
#[group(multiple = false)]
struct ConflictFlags {
    /// Keep local changes on conflict
    #[arg(short = 'l', long)]
    keep_local: bool,

    /// Overwrite local changes with the remote version on conflict
    #[arg(short = 'r', long)]
    overwrite: bool,
}

impl ConflictFlags {
    fn strategy(self) -> PullStrategy {
        if self.keep_local {
            PullStrategy::KeepLocal
        } else if self.overwrite {
            PullStrategy::OverwriteWithRemote
        } else {
            PullStrategy::Ask
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a repository in your GitHub account
    New {
        /// Create a private repository
        #[arg(short = 'p', long)]
        private: bool,
        /// Repository name, without the owner
        name: String,
        /// Repository description
        description: Vec<String>,
    },

    /// Delete a repository on GitHub, after typing its full name to confirm
    Destroy {
        /// Repository, as `owner/name` or just `name` for your own
        repository: String,
    },

    /// Download a repository into an empty directory and link it
    Clone {
        /// Repository, as `owner/name` or just `name` for your own
        repository: String,
        /// Local directory (created if missing)
        directory: Option<PathBuf>,
    },

    /// Link a directory to a repository without downloading anything
    Link {
        /// Repository, as `owner/name` or just `name` for your own
        repository: String,
        /// Local directory
        directory: Option<PathBuf>,
    },

    /// Remove the link, keeping every file
    Unlink {
        /// Local directory
        directory: Option<PathBuf>,
    },

    /// Show local changes and whether the remote branch moved
    Status {
        /// Local directory
        directory: Option<PathBuf>,
    },

    /// Bring remote changes into the local directory
    Pull {
        #[command(flatten)]
        conflicts: ConflictFlags,
    },

    /// Publish every local change as one commit
    Commit {
        /// Commit message
        message: String,
    },

    /// Discard local changes in files matching a pathspec (`*` for all)
    Reset {
        /// Glob, exact deleted path, or `*`
        pathspec: String,
    },

    /// List remote branches
    Branches,

    /// Switch, create or delete remote branches
    #[command(subcommand)]
    Branch(BranchCommand),

    /// Merge a branch into another on the remote
    Merge {
        /// Branch to merge from
        source: String,
        /// Branch to merge into
        base: String,
        /// Merge commit message
        message: Option<String>,
    },
}

#[derive(Subcommand)]
enum BranchCommand {
    /// Switch to a branch, or to a commit by its 40-hex id
    Switch {
        /// Branch name or commit id
        target: String,
        #[command(flatten)]
        conflicts: ConflictFlags,
    },

    /// Create a remote branch at the current commit or at another branch
    New {
        /// Branch name
        name: String,
        /// Branch whose head the new branch starts from
        base: Option<String>,
    },

    /// Delete a remote branch
    Delete {
        /// Branch name
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = dispatch(cli) {
        eprintln!("*** {err}");
        if let Some(sync) = err.downcast_ref::<SyncError>() {
            for field in sync.field_errors() {
                eprintln!("{field}");
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let here = match cli.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::New {
            private,
            name,
            description,
        } => {
            commands::admin::new(&name, &description.join(" "), private)?;
        }
        Commands::Destroy { repository } => {
            commands::admin::destroy(&repository)?;
        }
        Commands::Clone {
            repository,
            directory,
        } => {
            let dir = directory.map_or_else(|| here.clone(), |d| here.join(d));
            commands::attach::clone(&dir, &repository)?;
        }
        Commands::Link {
            repository,
            directory,
        } => {
            let dir = directory.map_or_else(|| here.clone(), |d| here.join(d));
            commands::attach::link(&dir, &repository)?;
        }
        Commands::Unlink { directory } => {
            commands::attach::unlink(&directory.map_or(here.clone(), |d| here.join(d)))?;
        }
        Commands::Status { directory } => {
            commands::status::run(&directory.map_or(here.clone(), |d| here.join(d)))?;
        }
        Commands::Pull { conflicts } => {
            commands::sync::pull(&here, conflicts.strategy())?;
        }
        Commands::Commit { message } => {
            commands::sync::commit(&here, &message)?;
        }
        Commands::Reset { pathspec } => {
            let pathspec = (pathspec != "*").then_some(pathspec);
            commands::sync::reset(&here, pathspec.as_deref())?;
        }
        Commands::Branches => {
            commands::branch::list(&here)?;
        }
        Commands::Branch(BranchCommand::Switch { target, conflicts }) => {
            commands::branch::switch(&here, &target, conflicts.strategy())?;
        }
        Commands::Branch(BranchCommand::New { name, base }) => {
            commands::branch::create(&here, &name, base.as_deref())?;
        }
        Commands::Branch(BranchCommand::Delete { name }) => {
            commands::branch::delete(&here, &name)?;
        }
        Commands::Merge {
            source,
            base,
            message,
        } => {
            commands::branch::merge(&here, &source, &base, message.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn conflict_flags() {
        let cli = Cli::try_parse_from(["ngh", "pull", "--overwrite"]).unwrap();
        match cli.command {
            Commands::Pull { conflicts } => {
                assert_eq!(conflicts.strategy(), PullStrategy::OverwriteWithRemote)
            }
            _ => panic!("expected pull"),
        }

        let cli = Cli::try_parse_from(["ngh", "branch", "switch", "dev", "-l"]).unwrap();
        match cli.command {
            Commands::Branch(BranchCommand::Switch { target, conflicts }) => {
                assert_eq!(target, "dev");
                assert_eq!(conflicts.strategy(), PullStrategy::KeepLocal);
            }
            _ => panic!("expected branch switch"),
        }

        assert!(Cli::try_parse_from(["ngh", "pull", "-l", "-r"]).is_err());
    }

    #[test]
    fn new_takes_a_free_description() {
        let cli = Cli::try_parse_from(["ngh", "new", "-p", "notes", "my", "daily", "notes"]).unwrap();
        match cli.command {
            Commands::New {
                private,
                name,
                description,
            } => {
                assert!(private);
                assert_eq!(name, "notes");
                assert_eq!(description.join(" "), "my daily notes");
            }
            _ => panic!("expected new"),
        }
    }
}
