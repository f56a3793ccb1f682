//! Export routines for generated designs.
//!
//! - `svg`: raw SVG file for the laser cutter
//! - `raster`: SVG parsing and rasterization shared by the PDF export and the TUI preview
//! - `pdf`: A4 preview sheet with the rasterized design

pub mod pdf;
pub mod raster;
pub mod svg;

use crate::model::ExportKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Milliseconds since the Unix epoch, used to make export names unique.
pub fn timestamp_millis() -> i128 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

/// `<out_dir>/<stem>-<millis>.<ext>`, creating `out_dir` if needed.
pub fn output_path(out_dir: &Path, kind: ExportKind) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output directory {}", out_dir.display()))?;
    Ok(out_dir.join(format!(
        "{}-{}.{}",
        kind.file_stem(),
        timestamp_millis(),
        kind.extension()
    )))
}

#[cfg(test)]
pub(crate) fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lasercraft-test-{}-{}-{}",
        name,
        std::process::id(),
        timestamp_millis()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
