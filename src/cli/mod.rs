//! CLI argument parsing for lockpool.
//!
//! Uses clap derive macros for declarative argument definitions.
//! Each subcommand reads a JSON request on stdin and writes a JSON
//! response on stdout; implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Lockpool: a pool of locks shared through a git branch.
///
/// Locks are files in `<pool>/unclaimed/` and `<pool>/claimed/`; claiming
/// and releasing a lock is a commit pushed to the branch.
#[derive(Parser, Debug)]
#[command(name = "lockpool")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for lockpool.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List pool versions newer than (and including) the given one.
    Check,

    /// Write the lock changed by a version into a directory.
    ///
    /// Produces `name` and `metadata` files.
    In(InArgs),

    /// Acquire, claim, release, add, remove, or update a lock.
    Out(OutArgs),
}

/// Arguments for the `in` command.
#[derive(Args, Debug)]
pub struct InArgs {
    /// Directory that receives the lock files.
    pub destination: PathBuf,
}

/// Arguments for the `out` command.
#[derive(Args, Debug)]
pub struct OutArgs {
    /// Directory that lock descriptor params are relative to.
    pub source_dir: PathBuf,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
