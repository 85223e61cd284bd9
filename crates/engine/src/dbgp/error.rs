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

use std::io;

use thiserror::Error;

/// Result alias for DBGp operations
pub type DbgpResult<T> = std::result::Result<T, DbgpError>;

/// Errors raised while talking to the debug engine.
///
/// Transport errors end the session: a broken debuggee connection is never
/// retried. Malformed property payloads are not represented here, they
/// surface as error-kind variables instead.
#[derive(Debug, Error)]
pub enum DbgpError {
    /// The socket failed
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// The decimal length prefix of an inbound frame could not be parsed
    #[error("malformed frame length prefix: {0:?}")]
    MalformedLength(String),

    /// An inbound frame ran past its declared length without a terminator
    #[error("frame of {0} bytes is missing its terminator")]
    MissingTerminator(usize),

    /// The connection closed in the middle of a frame
    #[error("connection closed in the middle of a frame")]
    UnexpectedEof,

    /// A response was not well-formed XML
    #[error("malformed response: {0}")]
    Xml(#[from] roxmltree::Error),

    /// A response was well-formed but lacked something the engine always sends
    #[error("malformed response: {0}")]
    Malformed(String),
}
