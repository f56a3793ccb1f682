//! Post-generation processing utilities.
//!
//! Runs the exports requested on the command line once a design is available.

use crate::export;
use crate::model::GeneratedResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Result of post-generation processing, ready for presentation layers.
pub(crate) struct ProcessedGeneration {
    pub export_messages: Vec<String>,
    pub exported: Vec<PathBuf>,
    pub first_error: Option<anyhow::Error>,
}

/// Render and write the PDF preview on the blocking pool.
pub(crate) async fn export_pdf_blocking(result: GeneratedResult, out_dir: PathBuf) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || export::pdf::export_pdf(&result, &out_dir))
        .await
        .context("PDF export task failed")?
}

/// Write the requested exports for a finished generation.
pub(crate) async fn process_generation(
    result: &GeneratedResult,
    out_dir: &Path,
    svg: bool,
    pdf: bool,
) -> ProcessedGeneration {
    let mut processed = ProcessedGeneration {
        export_messages: Vec::new(),
        exported: Vec::new(),
        first_error: None,
    };

    if svg {
        match export::svg::export_svg(result, out_dir) {
            Ok(p) => {
                processed
                    .export_messages
                    .push(format!("Exported SVG: {}", p.display()));
                processed.exported.push(p);
            }
            Err(e) => {
                processed
                    .export_messages
                    .push(format!("Export SVG failed: {e:#}"));
                processed.first_error.get_or_insert(e);
            }
        }
    }
    if pdf {
        match export_pdf_blocking(result.clone(), out_dir.to_path_buf()).await {
            Ok(p) => {
                processed
                    .export_messages
                    .push(format!("Exported PDF: {}", p.display()));
                processed.exported.push(p);
            }
            Err(e) => {
                processed
                    .export_messages
                    .push(format!("Export PDF failed: {e:#}"));
                processed.first_error.get_or_insert(e);
            }
        }
    }

    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::sample_result;
    use crate::export::test_dir;

    #[tokio::test]
    async fn writes_both_exports() {
        let dir = test_dir("post-process");
        let processed = process_generation(&sample_result(), &dir, true, true).await;
        assert!(processed.first_error.is_none());
        assert_eq!(processed.exported.len(), 2);
        assert!(processed.exported.iter().all(|p| p.exists()));
        assert!(processed.export_messages[0].starts_with("Exported SVG"));
        assert!(processed.export_messages[1].starts_with("Exported PDF"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn pdf_failure_is_reported_and_svg_still_written() {
        let dir = test_dir("post-process-bad");
        let mut result = sample_result();
        result.svg_content = "<not-svg".into();
        let processed = process_generation(&result, &dir, true, true).await;
        assert_eq!(processed.exported.len(), 1);
        assert!(processed.first_error.is_some());
        assert!(processed.export_messages[1].starts_with("Export PDF failed"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn nothing_requested_writes_nothing() {
        let dir = test_dir("post-process-none");
        let processed = process_generation(&sample_result(), &dir, false, false).await;
        assert!(processed.exported.is_empty());
        assert!(processed.export_messages.is_empty());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        let _ = std::fs::remove_dir_all(dir);
    }
}
