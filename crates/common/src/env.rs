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

//! Environment variable name constants for PDL configuration.
//!
//! This module provides constant string names for all environment variables used by PDL.
//! These constants ensure consistency across the codebase and provide a single source of
//! truth for environment variable names.
//!
//! # Environment Variables
//!
//! ## Runtime Configuration
//! - [`PDL_PORT`] - Port the debugger listens on for the debuggee connection
//! - [`PDL_BIND`] - Address the debugger binds its listener to
//! - [`PDL_LOG_DIR`] - Overrides where file logs are written

/// Environment variable for the port the debuggee connects to.
///
/// Debug engines such as Xdebug connect back to the IDE on a well-known port.
/// PDL takes the IDE's place and listens there.
///
/// # Default
///
/// When not set, PDL listens on [`DEFAULT_DBGP_PORT`].
///
/// # Examples
///
/// ```bash
/// # Xdebug 3 defaults to 9003
/// PDL_PORT=9003 pdl targets.json
///
/// # Can also be set via CLI argument
/// pdl --port 9003 targets.json
/// ```
pub const PDL_PORT: &str = "PDL_PORT";

/// Environment variable for the listener bind address.
///
/// # Default
///
/// When not set, PDL binds to every interface (`0.0.0.0`) so that debuggees
/// running in containers or on other hosts can reach it.
pub const PDL_BIND: &str = "PDL_BIND";

/// Environment variable for the directory that receives file logs.
///
/// Only consulted when file logging is enabled (`--log-file`).
///
/// # Default
///
/// When not set, logs go to `<system temp dir>/pdl-logs/<component>`.
pub const PDL_LOG_DIR: &str = "PDL_LOG_DIR";

/// The port debug engines connect to unless told otherwise.
pub const DEFAULT_DBGP_PORT: u16 = 9000;
