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

//! Local source display
//!
//! Transcript headers quote the line the debuggee stopped on, read from the
//! local copy of the remote file.

use std::{fs, path::Path};

use eyre::{eyre, Context, Result};
use pdl_common::SessionConfig;
use tracing::warn;

use crate::dbgp::StopLocation;

/// Text of a 1-based line of a local file. Line 0 has no text.
pub fn source_line(path: &Path, line: u32) -> Result<String> {
    if line == 0 {
        return Ok(String::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source file: {}", path.display()))?;

    content
        .lines()
        .nth(line as usize - 1)
        .map(str::to_string)
        .ok_or_else(|| eyre!("{} has no line {line}", path.display()))
}

/// `<file>:<line>: <source text>` for a stop location.
///
/// A file with no configured local copy, or a line that cannot be read, is
/// shown with empty source text.
pub fn location_header(config: &SessionConfig, location: &StopLocation) -> String {
    let text = match config.local_path_for(&location.file) {
        Some(path) => source_line(path, location.line).unwrap_or_else(|err| {
            warn!("Cannot show source for {location}: {err:#}");
            String::new()
        }),
        None => {
            warn!("No local file for: {}", location.file);
            String::new()
        }
    };
    format!("{location}: {text}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdl_common::FileTarget;
    use std::io::Write;

    fn local_source() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<?php\n$a = 'x';\n  $b = &$a;\n").unwrap();
        file
    }

    #[test]
    fn test_lines_are_one_based() {
        let file = local_source();
        assert_eq!(source_line(file.path(), 1).unwrap(), "<?php");
        assert_eq!(source_line(file.path(), 3).unwrap(), "  $b = &$a;");
        assert_eq!(source_line(file.path(), 0).unwrap(), "");
        assert!(source_line(file.path(), 4).is_err());
    }

    #[test]
    fn test_header() {
        let file = local_source();
        let config = SessionConfig {
            files: vec![FileTarget {
                remote: "index.php".to_string(),
                local: file.path().to_path_buf(),
                lines: None,
                ignore_variables: vec![],
            }],
        };

        let stop = StopLocation { file: "file:///var/www/index.php".to_string(), line: 2 };
        assert_eq!(location_header(&config, &stop), "file:///var/www/index.php:2: $a = 'x';");

        let unknown = StopLocation { file: "file:///var/www/other.php".to_string(), line: 2 };
        assert_eq!(location_header(&config, &unknown), "file:///var/www/other.php:2: ");

        let past_end = StopLocation { file: "file:///var/www/index.php".to_string(), line: 99 };
        assert_eq!(location_header(&config, &past_end), "file:///var/www/index.php:99: ");
    }
}
