//! Runtime tunables for the `tourney` binary.
//!
//! Every value has a compile-time default and can be overridden through an
//! environment variable.

use std::path::PathBuf;

/// Default directory that relative output paths are resolved against.
const DEFAULT_OUTPUT_DIR: &str = ".";

/// Default directory for the rolling log file.
const DEFAULT_LOG_DIR: &str = "logs";

/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

/// Get the directory that relative output paths are resolved against.
///
/// Priority:
/// 1. `TOURNEY_OUTPUT_DIR` env variable if set
/// 2. the current directory
pub fn get_output_dir() -> PathBuf {
    if let Ok(path) = std::env::var("TOURNEY_OUTPUT_DIR") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Get the directory for the daily log file.
///
/// Priority:
/// 1. `TOURNEY_LOG_DIR` env variable if set
/// 2. `logs` as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(path) = std::env::var("TOURNEY_LOG_DIR") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}
