use crate::model::GenerationRequest;
use serde_json::{json, Value};

/// System instruction describing the machine parameters and SVG rules.
pub(crate) fn system_instruction(req: &GenerationRequest, description_language: &str) -> String {
    let s = &req.settings;
    let mut out = String::new();
    out.push_str(
        "You are an expert engineer and graphic designer specializing in laser cutting \
         and in generating SVG files.\n\
         Your task is to produce technically precise SVG code from the user's request.\n\n",
    );
    out.push_str("MACHINE PARAMETERS:\n");
    out.push_str(&format!(
        "- Cut: color {}, stroke width {}mm. Use <path>, <rect> or <circle> elements \
         without fill (fill=\"none\") and with a stroke.\n",
        s.cut_color, s.cut_stroke_width
    ));
    out.push_str(&format!(
        "- Engrave: color {color}, fill {color} or a thick stroke.\n\n",
        color = s.engrave_color
    ));
    out.push_str(&format!("MODE: {}\n", req.mode.intent()));
    out.push_str(&format!(
        "MATERIAL THICKNESS: {}mm (important for joints in 3D puzzle mode).\n\n",
        s.material_thickness
    ));
    out.push_str("SVG RULES:\n");
    out.push_str("1. It must be valid XML.\n");
    out.push_str("2. It must set 'viewBox' and real 'width' and 'height' in mm.\n");
    out.push_str("3. Every cut path must be closed.\n");
    out.push_str(&format!(
        "4. For a 3D puzzle, produce a flat layout of every part needed to assemble the \
         object and size the slots for the material thickness ({}mm).\n",
        s.material_thickness
    ));
    out.push_str(
        "5. Be creative but keep the design physically manufacturable (no parts that are too thin).\n",
    );
    out.push_str(&format!(
        "\nWrite the 'description' field in {description_language}.\n"
    ));
    out
}

/// The user turn sent alongside the system instruction.
pub(crate) fn user_text(req: &GenerationRequest) -> String {
    format!("Create a design: {}", req.prompt.trim())
}

/// JSON schema the model must follow. Every field is a required string.
pub(crate) fn response_schema(description_language: &str) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "svgContent": {
                "type": "STRING",
                "description": "The complete, valid SVG XML string. Must include viewBox, width, and height attributes."
            },
            "description": {
                "type": "STRING",
                "description": format!("A short technical description of the generated design in {description_language}.")
            },
            "width": {
                "type": "STRING",
                "description": "The width of the design (e.g., '100mm')."
            },
            "height": {
                "type": "STRING",
                "description": "The height of the design (e.g., '100mm')."
            }
        },
        "required": ["svgContent", "description", "width", "height"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppMode, GeneratorSettings};

    fn request(mode: AppMode) -> GenerationRequest {
        GenerationRequest {
            prompt: "  a jewelry box ".into(),
            mode,
            settings: GeneratorSettings {
                cut_color: "#FF0000".into(),
                engrave_color: "#0000FF".into(),
                cut_stroke_width: 0.05,
                material_thickness: 4.0,
            },
        }
    }

    #[test]
    fn instruction_embeds_settings_and_mode() {
        let text = system_instruction(&request(AppMode::ThreeDPuzzle), "English");
        assert!(text.contains("color #FF0000, stroke width 0.05mm"));
        assert!(text.contains("color #0000FF"));
        assert!(text.contains("MODE: 3D PUZZLE"));
        assert!(text.contains("MATERIAL THICKNESS: 4mm"));
        assert!(text.contains("flat layout"));
        assert!(text.contains("in English"));
    }

    #[test]
    fn two_d_mode_is_labelled_flat() {
        let text = system_instruction(&request(AppMode::TwoD), "Czech");
        assert!(text.contains("MODE: 2D DESIGN (flat)"));
        assert!(text.contains("in Czech"));
    }

    #[test]
    fn layout_rule_is_stated_once_in_every_mode() {
        for mode in [AppMode::TwoD, AppMode::ThreeDPuzzle] {
            let text = system_instruction(&request(mode), "English");
            assert_eq!(text.matches("\n4. ").count(), 1);
            assert!(text.contains("slots for the material thickness (4mm)"));
        }
    }

    #[test]
    fn user_text_trims_prompt() {
        assert_eq!(
            user_text(&request(AppMode::TwoD)),
            "Create a design: a jewelry box"
        );
    }

    #[test]
    fn schema_requires_all_fields() {
        let schema = response_schema("English");
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["svgContent", "description", "width", "height"]);
        for key in required {
            assert_eq!(schema["properties"][key]["type"], "STRING");
        }
    }
}
