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

//! Run state machine
//!
//! The engine is attached mid-session and starts out in `break`. Each `run`
//! reply either reports a new stop location, or carries no stop message, in
//! which case there is nothing left to inspect.

use std::fmt::{self, Display};

use tracing::{debug, warn};

use super::{
    error::DbgpResult,
    response::{first_element, parse, response_status},
};

/// Execution status reported by the debug engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Engine is initialising, no code has run yet
    Starting,
    /// Suspended and ready for inspection
    Break,
    /// Executing
    Running,
    /// Script finished; the engine waits for a last command
    Stopping,
    /// Engine detached or the connection is gone
    Stopped,
    /// A status this client does not know
    Other(String),
}

impl From<&str> for SessionStatus {
    fn from(status: &str) -> Self {
        match status {
            "starting" => Self::Starting,
            "break" => Self::Break,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Break => f.write_str("break"),
            Self::Running => f.write_str("running"),
            Self::Stopping => f.write_str("stopping"),
            Self::Stopped => f.write_str("stopped"),
            Self::Other(status) => f.write_str(status),
        }
    }
}

/// Where execution is suspended
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StopLocation {
    /// File URI as reported by the engine
    pub file: String,
    /// Line number as reported by the engine (1-based)
    pub line: u32,
}

impl Display for StopLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Status and location of the debuggee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    status: SessionStatus,
    location: Option<StopLocation>,
}

impl Default for RunState {
    fn default() -> Self {
        Self { status: SessionStatus::Break, location: None }
    }
}

impl RunState {
    /// Current status
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Current stop location, if the last reply reported one
    pub fn location(&self) -> Option<&StopLocation> {
        self.location.as_ref()
    }

    /// Whether the debuggee is suspended and can be inspected
    pub fn is_at_break(&self) -> bool {
        self.status == SessionStatus::Break
    }

    /// Update from the reply to a `run` command
    pub fn apply_run_response(&mut self, response: &str) -> DbgpResult<()> {
        let document = parse(response)?;
        self.status = SessionStatus::from(response_status(&document)?);

        self.location = first_element(&document, "message").and_then(|message| {
            let file = message.attribute("filename")?.to_string();
            let line = match message.attribute("lineno").map(str::parse::<u32>) {
                Some(Ok(line)) => line,
                other => {
                    warn!(?other, "Stop message without a usable line number");
                    0
                }
            };
            Some(StopLocation { file, line })
        });

        debug!(status = %self.status, location = ?self.location, "Run state updated");
        Ok(())
    }

    /// The debuggee went away
    pub fn mark_disconnected(&mut self) {
        self.status = SessionStatus::Stopped;
        self.location = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_break() {
        let state = RunState::default();
        assert!(state.is_at_break());
        assert_eq!(state.location(), None);
    }

    #[test]
    fn test_break_with_message_updates_location() {
        let mut state = RunState::default();
        state
            .apply_run_response(
                r#"<?xml version="1.0" encoding="iso-8859-1"?>
                <response xmlns="urn:debugger_protocol_v1" xmlns:xdebug="https://xdebug.org/dbgp/xdebug"
                    command="run" transaction_id="7" status="break" reason="ok">
                    <xdebug:message filename="file:///var/www/index.php" lineno="12"></xdebug:message>
                </response>"#,
            )
            .unwrap();

        assert!(state.is_at_break());
        assert_eq!(
            state.location(),
            Some(&StopLocation { file: "file:///var/www/index.php".to_string(), line: 12 })
        );
    }

    #[test]
    fn test_stopping_without_message_clears_location() {
        let mut state = RunState::default();
        state
            .apply_run_response(
                r#"<response status="break"><message filename="a.php" lineno="1"/></response>"#,
            )
            .unwrap();
        state
            .apply_run_response(r#"<response command="run" status="stopping" reason="ok"/>"#)
            .unwrap();

        assert_eq!(state.status(), &SessionStatus::Stopping);
        assert!(!state.is_at_break());
        assert_eq!(state.location(), None);
    }

    #[test]
    fn test_unknown_status_is_kept() {
        let mut state = RunState::default();
        state.apply_run_response(r#"<response status="paused"/>"#).unwrap();
        assert_eq!(state.status(), &SessionStatus::Other("paused".to_string()));
        assert_eq!(state.status().to_string(), "paused");
        assert!(!state.is_at_break());
    }

    #[test]
    fn test_disconnect() {
        let mut state = RunState::default();
        state.mark_disconnected();
        assert_eq!(state.status(), &SessionStatus::Stopped);
    }

    #[test]
    fn test_garbage_reply_is_an_error() {
        let mut state = RunState::default();
        assert!(state.apply_run_response("<response").is_err());
        assert!(state.apply_run_response("<response/>").is_err());
    }
}
