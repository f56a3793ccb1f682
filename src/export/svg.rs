use super::output_path;
use crate::model::{ExportKind, GeneratedResult};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Write the SVG exactly as returned by the model.
pub fn export_svg(result: &GeneratedResult, out_dir: &Path) -> Result<PathBuf> {
    let path = output_path(out_dir, ExportKind::Svg)?;
    std::fs::write(&path, result.svg_content.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = result.svg_content.len(), "SVG exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::sample_result;
    use crate::export::test_dir;

    #[test]
    fn exported_bytes_match_svg_content() {
        let dir = test_dir("svg-export");
        let mut result = sample_result();
        // Non-ASCII and odd whitespace must survive untouched.
        result.svg_content.push_str("\n<!-- Žluťoučký kůň -->\r\n");

        let path = export_svg(&result, &dir).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, result.svg_content.as_bytes());
        assert_eq!(path.extension().unwrap(), "svg");
        let _ = std::fs::remove_dir_all(dir);
    }
}
