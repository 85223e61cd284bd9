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

//! Test utilities for integration tests

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{Context, Result};

/// Initialization utilities for tests
pub mod init {
    /// Initialize logging for a test binary; safe to call from every test
    pub fn init_test_environment() {
        pdl_common::logging::ensure_test_logging(None);
    }
}

/// Write a local source file, one entry per line
pub fn write_source(dir: &Path, name: &str, lines: &[&str]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut contents = lines.join("\n");
    contents.push('\n');
    fs::write(&path, contents).wrap_err_with(|| format!("Cannot write {}", path.display()))?;
    Ok(path)
}

/// Drive full sessions against a [`MockDebuggee`](crate::mock_debuggee::MockDebuggee)
pub mod session {
    use eyre::{Context, Result};
    use pdl_common::SessionConfig;
    use pdl_engine::{DbgpClient, Session, SessionSummary};
    use tokio::net::TcpListener;
    use tracing::info;

    use crate::mock_debuggee::{MockDebuggee, ReceivedCommand};

    /// Everything a finished session produced
    #[derive(Debug)]
    pub struct SessionRun {
        /// Text written to the output
        pub transcript: String,
        /// What the session reported about itself
        pub summary: SessionSummary,
        /// Commands the debuggee received, in order
        pub commands: Vec<ReceivedCommand>,
    }

    impl SessionRun {
        /// Commands named `name`
        pub fn commands_named<'a>(
            &'a self,
            name: &'a str,
        ) -> impl Iterator<Item = &'a ReceivedCommand> + 'a {
            self.commands.iter().filter(move |command| command.name == name)
        }
    }

    /// Listen on an ephemeral port, let `debuggee` connect and run a session
    /// with `config` to completion.
    pub async fn run_session(config: SessionConfig, debuggee: MockDebuggee) -> Result<SessionRun> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        info!(%address, "Waiting for mock debuggee");

        let debuggee = tokio::spawn(debuggee.connect(address));
        let client = DbgpClient::accept(&listener).await?;

        let mut transcript = Vec::new();
        let summary = Session::new(client, config).run_to_completion(&mut transcript).await?;

        let commands = debuggee.await.wrap_err("Mock debuggee task failed")??;
        Ok(SessionRun { transcript: String::from_utf8(transcript)?, summary, commands })
    }
}
