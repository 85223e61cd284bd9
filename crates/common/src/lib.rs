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

//! PDL Common - Shared functionality for PDL components
//!
//! This crate provides the pieces shared by the `pdl` binary, the protocol
//! engine and the integration tests: the typed session configuration, the
//! environment variable names, and the logging setup.

/// Typed session configuration: which files to instrument and how
pub mod config;
/// Environment variable names recognised by PDL
pub mod env;
/// Logging setup and utilities for consistent logging across PDL components
pub mod logging;

pub use config::*;
pub use env::*;
