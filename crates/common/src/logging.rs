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

//! Logging configuration for PDL components
//!
//! Provides centralized logging setup with:
//! - Colorful console output on stderr, so it never interleaves with the transcript
//! - Optional file logging with daily rotation
//! - Environment variable support (RUST_LOG)
//! - Default INFO level

use eyre::Result;
use std::{env, fs, io, path::PathBuf, sync::Once};
use tracing::Level;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::env::PDL_LOG_DIR;

/// Target of the per-frame wire logging in the engine. Raw frames are logged
/// at `trace`: the log file records them, the console never shows them.
const WIRE_TARGET: &str = "pdl_engine::dbgp::codec";

/// Initialize logging for PDL components
///
/// This function sets up:
/// - Structured console logging with timestamps, written to stderr
/// - File logging with daily rotation when `enable_file_logging` is set
/// - Environment variable support for log levels (RUST_LOG)
/// - Default INFO level if no RUST_LOG is set
///
/// # Arguments
/// * `component_name` - Name of the component (e.g., "pdl")
/// * `enable_file_logging` - Whether to also write logs to a file
///
/// # Examples
/// ```ignore
/// use pdl_common::logging;
///
/// #[tokio::main]
/// async fn main() -> eyre::Result<()> {
///     logging::init_logging("pdl", false)?;
///
///     tracing::info!("Application started");
///     Ok(())
/// }
/// ```
pub fn init_logging(component_name: &str, enable_file_logging: bool) -> Result<()> {
    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(true)
        .with_writer(io::stderr)
        .pretty();

    if enable_file_logging {
        let log_dir = create_log_directory(component_name)?;

        // Create file appender with daily rotation
        let file_appender = rolling::daily(&log_dir, format!("{component_name}.log"));
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        // The guard flushes on drop; the subscriber lives for the whole process
        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(LocalTime::rfc_3339())
            .with_ansi(false)
            .with_writer(non_blocking_appender);

        tracing_subscriber::registry()
            .with(console_layer.with_filter(filter_for_console()?))
            .with(file_layer.with_filter(filter_for_file()?))
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

        tracing::info!(
            component = component_name,
            log_dir = %log_dir.display(),
            "Logging initialized with console and file output"
        );
    } else {
        tracing_subscriber::registry()
            .with(console_layer.with_filter(filter_for_console()?))
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))?;

        tracing::info!(component = component_name, "Logging initialized with console output only");
    }

    log_environment_info(component_name);

    Ok(())
}

/// Create the log directory, honouring [`PDL_LOG_DIR`]
fn create_log_directory(component_name: &str) -> Result<PathBuf> {
    let root = match env::var_os(PDL_LOG_DIR) {
        Some(dir) => PathBuf::from(dir),
        None => env::temp_dir().join("pdl-logs"),
    };
    let log_dir = root.join(component_name);

    fs::create_dir_all(&log_dir)?;

    Ok(log_dir)
}

/// Filter for console output - everything except raw wire frames
fn filter_for_console() -> Result<EnvFilter> {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    Ok(filter.add_directive(format!("{WIRE_TARGET}=info").parse()?))
}

/// Filter for file output - be more verbose for debugging, raw frames included
fn filter_for_file() -> Result<EnvFilter> {
    let filter =
        EnvFilter::builder().with_default_directive(LevelFilter::DEBUG.into()).from_env_lossy();
    Ok(filter.add_directive(format!("{WIRE_TARGET}=trace").parse()?))
}

/// Log useful environment information
fn log_environment_info(component_name: &str) {
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let args: Vec<String> = env::args().collect();

    tracing::info!(
        component = component_name,
        rust_log = %rust_log,
        args = ?args,
        "Environment information"
    );

    if let Ok(current_dir) = env::current_dir() {
        tracing::debug!(
            working_directory = %current_dir.display(),
            "Working directory"
        );
    }
}

/// Initialize simple logging (console only, no fancy formatting)
///
/// This is useful for tests or simple utilities that don't need
/// the full logging setup.
pub fn init_simple_logging(level: Level) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level.as_str()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to initialize simple logging: {}", e))?;

    Ok(())
}

// Global test logging initialization - ensures logging is only set up once across all tests
static TEST_LOGGING_INIT: Once = Once::new();

/// Safe logging initialization for tests - can be called multiple times without crashing
///
/// Uses `std::sync::Once` so initialization happens only once per test process.
/// Defaults to INFO (or `default_level`), but respects RUST_LOG if set.
///
/// # Usage
/// ```rust
/// use pdl_common::logging;
/// use tracing::info;
///
/// #[test]
/// fn my_test() {
///     logging::ensure_test_logging(None);
///     info!("This will work safely in any test!");
/// }
/// ```
pub fn ensure_test_logging(default_level: Option<Level>) {
    TEST_LOGGING_INIT.call_once(|| {
        let default_level = default_level.unwrap_or(Level::INFO);
        // A subscriber may already be installed by the harness; that is fine
        let _ = init_simple_logging(default_level);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, error, info, warn};

    fn init_test_logging() {
        ensure_test_logging(None);
    }

    #[test]
    fn test_logging_functions_work() {
        init_test_logging();

        info!("Test info message");
        warn!("Test warning message");
        debug!("Test debug message");
        error!("Test error message");
    }

    #[test]
    #[serial]
    fn test_log_directory_creation() {
        env::remove_var(PDL_LOG_DIR);
        let log_dir = create_log_directory("test-component").unwrap();
        assert!(log_dir.exists());
        assert!(log_dir.to_string_lossy().contains("pdl-logs"));
        assert!(log_dir.to_string_lossy().contains("test-component"));
    }

    #[test]
    #[serial]
    fn test_log_directory_override() {
        let root = tempfile::tempdir().unwrap();
        env::set_var(PDL_LOG_DIR, root.path());

        let log_dir = create_log_directory("pdl").unwrap();
        env::remove_var(PDL_LOG_DIR);

        assert_eq!(log_dir, root.path().join("pdl"));
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_console_filter_silences_wire_frames() {
        let console_filter = filter_for_console().unwrap();
        assert!(console_filter.to_string().contains(&format!("{WIRE_TARGET}=info")));
    }

    #[test]
    fn test_file_filter_records_wire_frames() {
        let file_filter = filter_for_file().unwrap();
        assert!(file_filter.to_string().contains(&format!("{WIRE_TARGET}=trace")));
    }

    #[test]
    fn test_logging_initialization_safety() {
        init_test_logging();

        // A subscriber is already installed, so these fail but must not panic
        let result1 = init_logging("test-pdl-1", false);
        let result2 = init_logging("test-pdl-2", false);
        assert!(result1.is_err() || result2.is_err());

        info!("Test logging after init attempts");
    }
}
