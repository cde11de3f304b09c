//! rollsync - rolling-checksum file delta tool

use anyhow::Context;
use clap::Parser;
use rollsync::cli::{Cli, Commands, DeltaArgs, PatchArgs, SignArgs, SyncArgs};
use rollsync::config::Config;
use rollsync::delta::{delta_file, encode_instruction, Instruction};
use rollsync::patch::{apply_delta, Reconstructor};
use rollsync::signature::{
    read_signature_file, sign_file, write_signature_file, MIN_BLOCK_SIZE,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.verbose = config.verbose.max(cli.verbose);
    config.json_logs = config.json_logs || cli.json;

    init_tracing(config.verbose, config.json_logs);

    match cli.command {
        Commands::Sign(args) => run_sign(args, &config),
        Commands::Delta(args) => run_delta(args),
        Commands::Patch(args) => run_patch(args),
        Commands::Sync(args) => run_sync(args, &config),
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("rollsync=info"),
        1 => EnvFilter::new("rollsync=debug"),
        2 => EnvFilter::new("rollsync=trace"),
        _ => EnvFilter::new("trace"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

fn pick_block_size(requested: Option<u16>, config: &Config) -> anyhow::Result<u16> {
    let block_size = requested.unwrap_or(config.block_size);
    anyhow::ensure!(
        block_size >= MIN_BLOCK_SIZE,
        "block size {} below minimum {}",
        block_size,
        MIN_BLOCK_SIZE
    );
    Ok(block_size)
}

fn run_sign(args: SignArgs, config: &Config) -> anyhow::Result<()> {
    let block_size = pick_block_size(args.block_size, config)?;
    let output = args
        .output
        .unwrap_or_else(|| sibling(&args.target, "sig"));

    let signature = sign_file(&args.target, block_size)
        .with_context(|| format!("signing {}", args.target.display()))?;
    write_signature_file(&signature, &output)?;

    tracing::info!(
        target = %args.target.display(),
        output = %output.display(),
        blocks = signature.block_count(),
        "signature written"
    );
    Ok(())
}

fn run_delta(args: DeltaArgs) -> anyhow::Result<()> {
    let signature = read_signature_file(&args.signature)
        .with_context(|| format!("loading {}", args.signature.display()))?;
    let output = args
        .output
        .unwrap_or_else(|| sibling(&args.source, "delta"));

    let mut stream: Vec<Instruction> = Vec::new();
    delta_file(&args.source, &signature, &mut stream)
        .with_context(|| format!("computing delta of {}", args.source.display()))?;
    let mut encoded = Vec::new();
    for instruction in &stream {
        encode_instruction(instruction, &mut encoded);
    }
    std::fs::write(&output, &encoded)
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        source = %args.source.display(),
        output = %output.display(),
        bytes = encoded.len(),
        "delta written"
    );
    Ok(())
}

fn run_patch(args: PatchArgs) -> anyhow::Result<()> {
    let signature_path = args
        .signature
        .unwrap_or_else(|| sibling(&args.target, "sig"));
    let signature = read_signature_file(&signature_path)
        .with_context(|| format!("loading {}", signature_path.display()))?;
    let encoded = std::fs::read(&args.delta)
        .with_context(|| format!("reading {}", args.delta.display()))?;

    apply_delta(&args.target, &signature, &encoded)
        .with_context(|| format!("patching {}", args.target.display()))?;

    tracing::info!(target = %args.target.display(), "target rebuilt");
    Ok(())
}

fn run_sync(args: SyncArgs, config: &Config) -> anyhow::Result<()> {
    let block_size = pick_block_size(args.block_size, config)?;

    let signature = sign_file(&args.target, block_size)
        .with_context(|| format!("signing {}", args.target.display()))?;
    let mut reconstructor = Reconstructor::new(&args.target, &signature);
    delta_file(&args.source, &signature, &mut reconstructor)
        .with_context(|| format!("syncing {} from {}", args.target.display(), args.source.display()))?;

    tracing::info!(
        source = %args.source.display(),
        target = %args.target.display(),
        "sync complete"
    );
    Ok(())
}

/// `<path>.<ext>` next to the original file.
fn sibling(path: &std::path::Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
