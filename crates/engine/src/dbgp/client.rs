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

//! DBGp transaction engine
//!
//! Commands are answered strictly in order and only one is ever outstanding:
//! every command is written with the next transaction id, then exactly one
//! frame is read back.
//!
//! Once the debuggee has gone away the client stays disconnected: later
//! commands are not sent and behave as if the stream had ended.

use std::io;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, instrument, warn};

use super::{
    codec::{encode_command, FrameCodec},
    error::{DbgpError, DbgpResult},
    response::{decode_payload, first_element, parse, properties, property_name},
    state::{RunState, SessionStatus},
};
use crate::{
    graph::PropertySource,
    variable::{is_top_level, PlaceholderAddresses, Variable},
};

/// What the engine announces when it connects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitPacket {
    /// Script the debuggee started with
    pub file_uri: Option<String>,
    /// Language the engine debugs
    pub language: Option<String>,
    /// IDE key the session was started with
    pub ide_key: Option<String>,
}

/// Client side of one DBGp session
#[derive(Debug)]
pub struct DbgpClient<S> {
    codec: FrameCodec<S>,
    next_transaction_id: u64,
    state: RunState,
    connected: bool,
}

impl DbgpClient<TcpStream> {
    /// Wait for the debuggee to connect. Only one connection is ever accepted.
    pub async fn accept(listener: &TcpListener) -> DbgpResult<Self> {
        let (stream, peer) = listener.accept().await?;
        stream.set_nodelay(true)?;
        info!(%peer, "Debuggee connected");
        Ok(Self::new(stream))
    }
}

impl<S> DbgpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream
    pub fn new(stream: S) -> Self {
        Self {
            codec: FrameCodec::new(stream),
            next_transaction_id: 0,
            state: RunState::default(),
            connected: true,
        }
    }

    /// Status and location of the debuggee
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Whether the debuggee is still there to answer commands
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Transaction id the next command will carry
    pub fn next_transaction_id(&self) -> u64 {
        self.next_transaction_id
    }

    /// Send a command and wait for its reply.
    ///
    /// Returns `None` when the debuggee closed the connection instead of
    /// answering, or had already closed it before the command was written.
    #[instrument(level = "debug", skip(self), fields(transaction_id = self.next_transaction_id))]
    pub async fn execute(&mut self, command: &str) -> DbgpResult<Option<String>> {
        if !self.connected {
            debug!("Not sent, debuggee disconnected");
            return Ok(None);
        }
        let transaction_id = self.next_transaction_id;
        self.next_transaction_id += 1;

        match self.codec.write_message(&encode_command(command, transaction_id)).await {
            Err(DbgpError::Io(err)) if is_hang_up(&err) => {
                debug!(transaction_id, %err, "Write failed, debuggee disconnected");
                self.disconnect();
                return Ok(None);
            }
            result => result?,
        }
        let response = self.codec.read_message().await?.map(decode_payload);
        if response.is_none() {
            debug!(transaction_id, "No reply, debuggee disconnected");
            self.disconnect();
        }
        Ok(response)
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.state.mark_disconnected();
    }

    /// Read the `init` packet the engine sends right after connecting
    pub async fn read_init(&mut self) -> DbgpResult<Option<InitPacket>> {
        let Some(payload) = self.codec.read_message().await? else {
            return Ok(None);
        };
        let text = decode_payload(payload);
        let document = parse(&text)?;

        let init = first_element(&document, "init")
            .map(|init| InitPacket {
                file_uri: init.attribute("fileuri").map(str::to_string),
                language: init.attribute("language").map(str::to_string),
                ide_key: init.attribute("idekey").map(str::to_string),
            })
            .unwrap_or_default();
        info!(file = ?init.file_uri, language = ?init.language, "Debug engine ready");
        Ok(Some(init))
    }

    /// Set a line breakpoint. The reply is not inspected, and a debuggee that
    /// hangs up instead of answering is only logged.
    pub async fn add_breakpoint(&mut self, file: &str, line: u32) -> DbgpResult<()> {
        let command = format!("breakpoint_set -t line -f {} -n {line}", quote_argument(file));
        if self.execute(&command).await?.is_none() {
            warn!(file, line, "Debuggee disconnected while setting breakpoint");
        }
        Ok(())
    }

    /// Resume execution until the next breakpoint or the end of the script
    pub async fn run(&mut self) -> DbgpResult<&SessionStatus> {
        if let Some(response) = self.execute("run").await? {
            self.state.apply_run_response(&response)?;
        }
        Ok(self.state.status())
    }

    /// Names of the variables in the current scope.
    ///
    /// Only top-level names are returned; members and elements are reached
    /// through their parents.
    pub async fn fetch_context(&mut self) -> DbgpResult<Vec<String>> {
        let Some(response) = self.execute("context_get").await? else {
            return Ok(Vec::new());
        };
        let document = parse(&response)?;

        Ok(properties(&document)
            .filter_map(|property| property_name(&property))
            .filter(|name| is_top_level(name))
            .map(str::to_string)
            .collect())
    }

    /// Fetch one property and its immediate children by name
    pub async fn fetch_property(
        &mut self,
        name: &str,
        addresses: &mut PlaceholderAddresses,
    ) -> DbgpResult<Variable> {
        let command = format!("property_get -n {}", quote_argument(name));
        Ok(match self.execute(&command).await? {
            Some(response) => Variable::from_response(&response, addresses),
            None => Variable::error(addresses),
        })
    }
}

impl<S> PropertySource for DbgpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn fetch_property(
        &mut self,
        name: &str,
        addresses: &mut PlaceholderAddresses,
    ) -> DbgpResult<Variable> {
        Self::fetch_property(self, name, addresses).await
    }
}

fn is_hang_up(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}

/// Quote a command argument when it would otherwise be split by the engine.
///
/// Property names such as `$arr["a b"]` contain spaces and quotes; DBGp
/// accepts them wrapped in double quotes with `\` and `"` escaped.
pub fn quote_argument(argument: &str) -> String {
    if !argument.is_empty() && !argument.contains(|c: char| c.is_whitespace() || c == '"') {
        return argument.to_string();
    }
    let mut quoted = String::with_capacity(argument.len() + 2);
    quoted.push('"');
    for c in argument.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
