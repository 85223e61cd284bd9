// PDL - PHP Debug Log
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Session driver
//!
//! Instruments every configured file, then resumes the debuggee for as long
//! as it keeps breaking. On each break the variables in scope are
//! reconstructed and written to the transcript as one block.

use std::io::Write;

use eyre::{bail, Context, Result};
use pdl_common::SessionConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::{
    dbgp::{DbgpClient, SessionStatus},
    graph::GraphReconstructor,
    printer::render,
    source::location_header,
};

/// Outcome of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Breakpoints set before the first run
    pub breakpoints: usize,
    /// Stops written to the transcript
    pub stops: usize,
    /// Status the debuggee ended in
    pub final_status: SessionStatus,
}

/// One debugging session over an accepted debuggee connection
#[derive(Debug)]
pub struct Session<S> {
    client: DbgpClient<S>,
    config: SessionConfig,
    reconstructor: GraphReconstructor,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session on a freshly connected client
    pub fn new(client: DbgpClient<S>, config: SessionConfig) -> Self {
        Self { client, config, reconstructor: GraphReconstructor::new() }
    }

    /// The underlying protocol client
    pub fn client(&self) -> &DbgpClient<S> {
        &self.client
    }

    /// Set a breakpoint on every configured line. Returns how many were set.
    ///
    /// Stops early, without error, if the debuggee hangs up; the session then
    /// ends as `stopped` on its first `run`.
    pub async fn instrument(&mut self) -> Result<usize> {
        let mut count = 0;
        for target in &self.config.files {
            let lines = target
                .resolve_breakpoint_lines()
                .with_context(|| format!("Cannot choose breakpoint lines for {}", target.remote))?;
            info!(file = %target.remote, breakpoints = lines.len(), "Instrumenting file");

            for line in lines {
                self.client.add_breakpoint(&target.remote, line).await?;
                if !self.client.is_connected() {
                    warn!(set = count, "Debuggee hung up during instrumentation");
                    return Ok(count);
                }
                count += 1;
            }
        }
        Ok(count)
    }

    /// Reconstruct and render the variables in scope at the current stop
    pub async fn capture(&mut self) -> Result<Vec<String>> {
        let file = self.client.state().location().map(|l| l.file.clone()).unwrap_or_default();
        let roots = self.client.fetch_context().await?;
        debug!(%file, roots = roots.len(), "Capturing snapshot");

        let config = &self.config;
        let snapshot = self
            .reconstructor
            .reconstruct(&mut self.client, roots, |name| config.is_ignored(&file, name))
            .await?;
        Ok(render(&snapshot))
    }

    /// Transcript block for the current stop: location header, one line per
    /// variable, and a blank line.
    async fn stop_block(&mut self) -> Result<String> {
        let mut block = String::new();
        match self.client.state().location() {
            Some(location) => {
                info!(%location, "Stopped");
                block.push_str(&location_header(&self.config, location));
                block.push('\n');
            }
            None => warn!("Stopped without a location"),
        }
        for line in self.capture().await? {
            block.push_str(&line);
            block.push('\n');
        }
        block.push('\n');
        Ok(block)
    }

    /// Run the whole session, writing one block per stop to `out`
    pub async fn run_to_completion<W: Write>(&mut self, out: &mut W) -> Result<SessionSummary> {
        if self.client.read_init().await?.is_none() {
            bail!("Debuggee disconnected before sending its init packet");
        }

        let breakpoints = self.instrument().await?;
        info!(breakpoints, "Breakpoints set, resuming debuggee");

        let mut stops = 0;
        self.client.run().await?;
        while self.client.state().is_at_break() {
            let block = self.stop_block().await?;
            out.write_all(block.as_bytes()).wrap_err("Failed to write transcript")?;
            out.flush().wrap_err("Failed to write transcript")?;
            stops += 1;

            self.client.run().await?;
        }

        // The engine waits in `stopping` for one more command before it lets
        // the script end
        if self.client.state().status() == &SessionStatus::Stopping {
            debug!("Letting the debuggee finish");
            if let Err(err) = self.client.run().await {
                warn!(%err, "Debuggee did not acknowledge the final run");
            }
        }

        let final_status = self.client.state().status().clone();
        info!(stops, status = %final_status, "Session finished");
        Ok(SessionSummary { breakpoints, stops, final_status })
    }
}
