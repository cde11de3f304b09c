//! CLI argument parsing for rollsync

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rollsync - rolling-checksum file delta tool
#[derive(Parser, Debug)]
#[command(name = "rollsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a signature of the target file
    Sign(SignArgs),

    /// Compute a delta of a source file against a signature
    Delta(DeltaArgs),

    /// Apply a delta to the target file
    Patch(PatchArgs),

    /// Sign, match and reconstruct in one in-process run
    Sync(SyncArgs),
}

/// Arguments for the sign command
#[derive(Parser, Debug)]
pub struct SignArgs {
    /// Target file to summarize (the receiver's copy)
    pub target: PathBuf,

    /// Where to write the signature [default: <target>.sig]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Block size in bytes (64-65535)
    #[arg(short = 'B', long)]
    pub block_size: Option<u16>,
}

/// Arguments for the delta command
#[derive(Parser, Debug)]
pub struct DeltaArgs {
    /// Signature file produced by `sign`
    pub signature: PathBuf,

    /// Source file to transmit (the sender's copy)
    pub source: PathBuf,

    /// Where to write the delta [default: <source>.delta]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the patch command
#[derive(Parser, Debug)]
pub struct PatchArgs {
    /// Target file to rebuild in place
    pub target: PathBuf,

    /// Delta file produced by `delta`
    pub delta: PathBuf,

    /// Signature the delta was computed against [default: <target>.sig]
    #[arg(short, long)]
    pub signature: Option<PathBuf>,
}

/// Arguments for the sync command
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Source file (what the target should become)
    pub source: PathBuf,

    /// Target file (rebuilt atomically)
    pub target: PathBuf,

    /// Block size in bytes (64-65535)
    #[arg(short = 'B', long)]
    pub block_size: Option<u16>,
}
