//! Record one debugging session

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    net::SocketAddr,
};

use eyre::{Context, Result};
use pdl_common::SessionConfig;
use pdl_engine::{DbgpClient, Session, SessionSummary};
use tokio::net::TcpListener;
use tracing::info;

use crate::Cli;

/// Listen for the debug engine, accept one connection and write its
/// transcript to the configured output.
pub async fn record_session(cli: &Cli, config: SessionConfig) -> Result<SessionSummary> {
    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .wrap_err_with(|| format!("Cannot create output file {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };

    let address = SocketAddr::new(cli.bind, cli.port);
    let listener =
        TcpListener::bind(address).await.wrap_err_with(|| format!("Cannot listen on {address}"))?;
    info!("Waiting for debug engine on {address}");

    let client = DbgpClient::accept(&listener).await.wrap_err("Failed to accept debug engine")?;
    // One session per run
    drop(listener);

    let summary = Session::new(client, config).run_to_completion(&mut out).await?;
    out.flush().wrap_err("Failed to write transcript")?;
    Ok(summary)
}
