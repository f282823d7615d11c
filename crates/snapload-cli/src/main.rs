//! Snapload diagnostics CLI
//!
//! Inspects how the native library would be (or was) resolved and loaded
//! on this machine.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapload")]
#[command(about = "Native library bootstrap diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Log verbosity (overrides SNAPLOAD_LOG / RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detected platform, resource name and configuration
    Info,

    /// Load the native library and report where it came from
    Load,

    /// Extract the bundled binary for this platform without linking it
    Extract {
        /// Directory to extract into (defaults to SNAPLOAD_TMPDIR or the OS temp dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List bundled binaries
    Resources,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let result = match cli.command {
        Commands::Info => commands::info::execute(),
        Commands::Load => commands::load::execute(),
        Commands::Extract { out } => commands::extract::execute(out),
        Commands::Resources => commands::resources::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(flag: Option<&str>) {
    let filter = flag
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_env("SNAPLOAD_LOG").ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
