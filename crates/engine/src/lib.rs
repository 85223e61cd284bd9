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

//! PDL Engine - DBGp transaction engine and variable graph reconstruction
//!
//! This crate talks to a script-language debug engine (Xdebug and friends)
//! over DBGp, walks the debuggee's variables at every breakpoint and renders
//! them as a flat textual transcript.

pub mod dbgp;
pub use dbgp::*;

pub mod graph;
pub use graph::*;

pub mod printer;
pub use printer::*;

pub mod session;
pub use session::*;

pub mod source;
pub use source::*;

pub mod variable;
pub use variable::*;
