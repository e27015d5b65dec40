//! Server binary: parse flags, load configuration, serve stdio.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fs_warden::config::ServerConfig;
use fs_warden::engine::Engine;

/// A filesystem RPC server for LLM agent workflows.
#[derive(Debug, Parser)]
#[command(name = "fs-warden", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Allowed root path; may be repeated. Empty means unrestricted.
    #[arg(long = "allow")]
    allowed_paths: Vec<PathBuf>,

    /// Backup store directory.
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Aggregate file-cache budget in bytes.
    #[arg(long)]
    cache_bytes: Option<u64>,

    /// Concurrent operation limit (default: 2 x CPUs, capped at 16).
    #[arg(long)]
    parallel_ops: Option<usize>,

    /// Trim verbose fields from responses.
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match args.config.as_deref().map(ServerConfig::load).transpose() {
        Ok(loaded) => loaded.unwrap_or_default(),
        Err(err) => {
            eprintln!("fs-warden: {err}");
            return std::process::ExitCode::from(2);
        }
    };

    if !args.allowed_paths.is_empty() {
        config.allowed_paths = args.allowed_paths;
    }
    if let Some(dir) = args.backup_dir {
        config.backup.root = Some(dir);
    }
    if let Some(bytes) = args.cache_bytes {
        config.cache.file_capacity_bytes = bytes;
    }
    if let Some(limit) = args.parallel_ops {
        config.parallel_ops = limit;
    }
    if args.compact {
        config.compact_responses = true;
    }

    info!(
        roots = config.allowed_paths.len(),
        parallel_ops = config.effective_parallel_ops(),
        backup_root = %config.backup_root().display(),
        "starting server"
    );

    match fs_warden::serve_stdio(Engine::new(config)).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fs-warden: transport failure: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
