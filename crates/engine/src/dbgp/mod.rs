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

//! DBGp protocol plumbing: framing, transactions and run state

/// Transaction engine: typed commands over the frame codec
pub mod client;
/// Length-prefixed, NUL-terminated frames
pub mod codec;
/// Protocol error type
pub mod error;
/// XML response helpers
pub mod response;
/// Run/break state machine
pub mod state;

pub use client::*;
pub use codec::{FrameCodec, LENGTH_CHUNK};
pub use error::*;
pub use state::*;
