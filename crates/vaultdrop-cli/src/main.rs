//! Vaultdrop CLI
//!
//! Runs the signaling server and exercises the encrypted transfer engine
//! locally.

mod config;
mod progress;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use vaultdrop_signal::SignalServer;
use vaultdrop_transfer::{
    TransferReceiver, TransferSender, memory_channel, progress_channel,
};

use config::Config;
use progress::{format_bytes, format_duration, join_progress_bar, spawn_progress_bar};

/// Frames buffered between the two halves of a loopback transfer
const LOOPBACK_CHANNEL_CAPACITY: usize = 32;

/// Vaultdrop - end-to-end encrypted browser file drop
#[derive(Parser)]
#[command(name = "vaultdrop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server
    Serve {
        /// Listen address, overriding the config file
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Print the effective configuration
    Config,

    /// Encrypt, send and verify a file over an in-process channel
    Loopback {
        /// File to transfer
        #[arg(required = true)]
        file: PathBuf,

        /// Write the received plaintext here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "debug"
        } else {
            config.logging.level.as_str()
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve { listen } => serve(&config, listen).await?,
        Commands::Config => show_config(&config, &config_path)?,
        Commands::Loopback { file, output } => loopback(&config, &file, output.as_deref()).await?,
    }

    Ok(())
}

/// Run the signaling server until Ctrl+C
async fn serve(config: &Config, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let server = SignalServer::new(config.server_config(listen)?)?;
    let settings = server.config();
    tracing::info!(
        ttl_secs = settings.session_ttl.as_secs(),
        sweep_secs = settings.sweep_interval.as_secs(),
        queue = settings.outbound_queue_capacity,
        "Starting signaling server on {}",
        settings.listen_addr
    );

    server.run().await?;
    Ok(())
}

fn show_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    let source = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("# {}{source}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Send a file through both halves of the transfer engine in-process
async fn loopback(config: &Config, file: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    println!("Transferring: {} ({})", name, format_bytes(data.len() as u64));

    let (mut tx, rx) = memory_channel(LOOPBACK_CHANNEL_CAPACITY);
    let (progress_tx, progress_rx) = progress_channel();
    let bar = spawn_progress_bar(format!("Receiving {name}"), progress_rx);
    let receiver = tokio::spawn(TransferReceiver::new().with_progress(progress_tx).receive(rx));

    let start = Instant::now();
    let sender = TransferSender::new(config.transfer_config());
    let sent = sender.send(&mut tx, &name, None, &data).await;
    drop(tx);

    let received = receiver.await.context("receiver task failed")?;
    join_progress_bar(bar).await;

    let report = sent?;
    let file_out = received?;
    let elapsed = start.elapsed();

    anyhow::ensure!(
        file_out.data == data,
        "received plaintext differs from the source file"
    );

    if let Some(path) = output {
        tokio::fs::write(path, &file_out.data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("Name:     {}", file_out.name);
    println!("Type:     {}", file_out.mime_type);
    println!("Chunks:   {}", report.chunks);
    println!("BLAKE3:   {}", file_out.hash);
    println!(
        "Elapsed:  {} ({}/s)",
        format_duration(elapsed),
        format_bytes((report.size as f64 / elapsed.as_secs_f64().max(0.001)) as u64)
    );

    Ok(())
}
