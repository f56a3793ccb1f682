//! Text summary builder for CLI output.

use crate::model::{AppMode, GeneratedResult, GeneratorSettings};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary of a generated design.
pub(crate) fn build_text_summary(
    result: &GeneratedResult,
    settings: &GeneratorSettings,
    mode: AppMode,
) -> TextSummary {
    let mut lines = vec![
        format!("Mode: {}", mode.label()),
        format!("Dimensions: {} x {}", result.width, result.height),
        format!(
            "Laser: cut {} @ {:.2} mm, engrave {}, material {:.1} mm",
            settings.cut_color,
            settings.cut_stroke_width,
            settings.engrave_color,
            settings.material_thickness
        ),
    ];
    if !result.description.trim().is_empty() {
        lines.push(format!("Description: {}", result.description.trim()));
    }
    lines.push(format!("SVG size: {} bytes", result.svg_content.len()));
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::sample_result;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_lists_dimensions_and_settings() {
        let summary = build_text_summary(
            &sample_result(),
            &GeneratorSettings::default(),
            AppMode::TwoD,
        );
        assert_eq!(summary.lines[0], "Mode: 2D Design");
        assert_eq!(summary.lines[1], "Dimensions: 40mm x 20mm");
        assert_eq!(
            summary.lines[2],
            "Laser: cut #FF0000 @ 0.10 mm, engrave #000000, material 3.0 mm"
        );
        assert!(summary.lines[3].starts_with("Description: A rectangular tag"));
    }

    #[test]
    fn blank_description_is_omitted() {
        let mut result = sample_result();
        result.description = "  ".into();
        let summary = build_text_summary(&result, &GeneratorSettings::default(), AppMode::ThreeDPuzzle);
        assert!(summary.lines.iter().all(|l| !l.starts_with("Description")));
    }
}
