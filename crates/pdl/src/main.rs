//! PDL - PHP Debug Log
//!
//! Waits for a PHP script to connect over DBGp, breaks on the configured
//! lines and writes every variable in scope at every stop.

use std::{net::IpAddr, path::PathBuf};

use clap::Parser;
use eyre::Result;
use pdl_common::{env::DEFAULT_DBGP_PORT, SessionConfig};

mod cmd;

/// Command-line interface for PDL
#[derive(Debug, Parser)]
#[command(name = "pdl")]
#[command(about = "PHP Debug Log - Records every variable at every breakpoint of a PHP script")]
#[command(version)]
pub struct Cli {
    /// Session configuration (JSON, or TOML when the file ends in .toml)
    pub config: PathBuf,

    /// Port to wait on for the debug engine
    #[arg(long, env = pdl_common::PDL_PORT, default_value_t = DEFAULT_DBGP_PORT)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, env = pdl_common::PDL_BIND, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Write the transcript to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Also write logs to a daily rotated file
    #[arg(long)]
    pub log_file: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    pdl_common::logging::init_logging("pdl", cli.log_file)?;

    let config = SessionConfig::load(&cli.config)?;
    tracing::info!("Debugging {} file(s)", config.files.len());

    let summary = cmd::record_session(&cli, config).await?;
    tracing::info!(
        "Recorded {} stop(s) with {} breakpoint(s); debuggee {}",
        summary.stops,
        summary.breakpoints,
        summary.final_status
    );

    Ok(())
}
