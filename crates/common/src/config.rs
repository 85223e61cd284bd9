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

//! Session configuration
//!
//! A session configuration lists the remote files to instrument. Each entry maps
//! a remote path (as the debug engine reports it) to a local copy of the same
//! source, optionally restricts breakpoints to specific lines, and names the
//! variable prefixes that should be left out of snapshots.
//!
//! Remote paths are matched by suffix: an entry with `remote = "app/index.php"`
//! applies to `file:///var/www/app/index.php`.

use eyre::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Number of the first line of a file, as debug engines count lines.
pub const FIRST_LINE: u32 = 1;

/// Configuration of one debugging session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Files to instrument, in the order breakpoints are set
    pub files: Vec<FileTarget>,
}

/// One instrumented file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTarget {
    /// Path suffix of the file as the debug engine sees it
    pub remote: String,
    /// Local copy of the file, used for line counts and source display
    pub local: PathBuf,
    /// Lines to break on; every line of the local file when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<u32>>,
    /// Variable name prefixes excluded from snapshots taken in this file
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_variables: Vec<String>,
}

/// Which lines of a file get a breakpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakpointLines {
    /// Exactly these lines
    Explicit(Vec<u32>),
    /// Every line of the local file
    AllLines,
}

impl SessionConfig {
    /// Load a configuration file. Paths ending in `.toml` are read as TOML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?
        } else {
            serde_json::from_str(&content).with_context(|| "Failed to parse config file as JSON")?
        };

        if config.files.is_empty() {
            bail!("Config file {} lists no files to debug", path.display());
        }

        debug!("Loaded configuration for {} file(s) from {}", config.files.len(), path.display());
        Ok(config)
    }

    /// Find the entry whose `remote` path is a suffix of `remote_file`
    pub fn target_for(&self, remote_file: &str) -> Option<&FileTarget> {
        self.files.iter().find(|target| remote_file.ends_with(&target.remote))
    }

    /// Local copy of a remote file, if the file is configured
    pub fn local_path_for(&self, remote_file: &str) -> Option<&Path> {
        self.target_for(remote_file).map(|target| target.local.as_path())
    }

    /// Breakpoint lines configured for a remote file
    pub fn breakpoint_lines_for(&self, remote_file: &str) -> Option<BreakpointLines> {
        self.target_for(remote_file).map(FileTarget::breakpoint_lines)
    }

    /// Variable prefixes ignored while stopped in `remote_file`
    pub fn ignored_prefixes_for(&self, remote_file: &str) -> &[String] {
        self.target_for(remote_file).map(|target| target.ignore_variables.as_slice()).unwrap_or(&[])
    }

    /// Whether `variable` should be left out of a snapshot taken in `remote_file`
    pub fn is_ignored(&self, remote_file: &str, variable: &str) -> bool {
        self.ignored_prefixes_for(remote_file).iter().any(|prefix| variable.starts_with(prefix))
    }
}

impl FileTarget {
    /// Breakpoint selection of this entry
    pub fn breakpoint_lines(&self) -> BreakpointLines {
        match &self.lines {
            Some(lines) => BreakpointLines::Explicit(lines.clone()),
            None => BreakpointLines::AllLines,
        }
    }

    /// Concrete line numbers to break on. [`BreakpointLines::AllLines`] is
    /// expanded using the line count of the local file, starting at
    /// [`FIRST_LINE`].
    pub fn resolve_breakpoint_lines(&self) -> Result<Vec<u32>> {
        match self.breakpoint_lines() {
            BreakpointLines::Explicit(lines) => Ok(lines),
            BreakpointLines::AllLines => {
                let content = fs::read_to_string(&self.local).with_context(|| {
                    format!("Failed to read local file: {}", self.local.display())
                })?;
                let count = u32::try_from(content.lines().count())
                    .with_context(|| format!("{} has too many lines", self.local.display()))?;
                Ok((FIRST_LINE..FIRST_LINE + count).collect())
            }
        }
    }
}
