//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive runs log to a file in the data
//! directory; text/JSON runs log to stderr.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "LASERCRAFT_LOG";

pub enum LogTarget {
    Stderr,
    File,
}

/// `<data_dir>/lasercraft/lasercraft.log`
pub fn log_file_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("lasercraft").join("lasercraft.log"))
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Returns the log file path when logging to a file.
pub fn init(target: LogTarget, silent: bool) -> Result<Option<PathBuf>> {
    match target {
        LogTarget::Stderr => {
            let default = if silent { "error" } else { "warn" };
            tracing_subscriber::fmt()
                .with_env_filter(filter(default))
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;
            Ok(None)
        }
        LogTarget::File => {
            let Some(path) = log_file_path() else {
                return Ok(None);
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter("info"))
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;
            Ok(Some(path))
        }
    }
}
