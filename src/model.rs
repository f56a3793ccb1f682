use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved settings for talking to the generation API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    pub thinking_budget: u32,
    pub description_language: String,
    pub user_agent: String,
}

/// Everything a session needs at launch, resolved from CLI flags and the config file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api: ApiConfig,
    pub prompt: String,
    pub mode: AppMode,
    pub settings: GeneratorSettings,
    pub out_dir: PathBuf,
    pub generate_on_launch: bool,
}

/// Laser machine parameters sent along with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub cut_color: String,
    pub engrave_color: String,
    /// Stroke width for cut paths, in millimeters.
    pub cut_stroke_width: f64,
    /// Sheet thickness in millimeters; drives slot sizes for puzzles.
    pub material_thickness: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            cut_color: "#FF0000".into(),
            engrave_color: "#000000".into(),
            cut_stroke_width: 0.1,
            material_thickness: 3.0,
        }
    }
}

/// What kind of design the model is asked for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AppMode {
    #[default]
    #[value(name = "2d")]
    #[serde(rename = "2D")]
    TwoD,
    #[value(name = "3d-puzzle")]
    #[serde(rename = "3D_PUZZLE")]
    ThreeDPuzzle,
}

impl AppMode {
    pub fn toggle(self) -> Self {
        match self {
            AppMode::TwoD => AppMode::ThreeDPuzzle,
            AppMode::ThreeDPuzzle => AppMode::TwoD,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppMode::TwoD => "2D Design",
            AppMode::ThreeDPuzzle => "3D Puzzle",
        }
    }

    /// Mode line embedded in the system instruction.
    pub fn intent(self) -> &'static str {
        match self {
            AppMode::TwoD => "2D DESIGN (flat)",
            AppMode::ThreeDPuzzle => "3D PUZZLE (interlocking parts)",
        }
    }

    /// Example prompt shown while the prompt box is empty.
    pub fn placeholder(self) -> &'static str {
        match self {
            AppMode::TwoD => {
                "e.g. A decorative mandala coaster with the word 'Coffee' engraved in the middle..."
            }
            AppMode::ThreeDPuzzle => "e.g. A small jewelry box with a hinged lid...",
        }
    }
}

/// Design returned by the model. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResult {
    pub svg_content: String,
    pub description: String,
    pub width: String,
    pub height: String,
}

/// Snapshot of the controller state taken when the user submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub mode: AppMode,
    pub settings: GeneratorSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    Svg,
    Pdf,
}

impl ExportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ExportKind::Svg => "svg",
            ExportKind::Pdf => "pdf",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ExportKind::Svg => "lasercraft-design",
            ExportKind::Pdf => "lasercraft-preview",
        }
    }
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    GenerationStarted,
    GenerationCompleted {
        // Boxed so that the SVG payload does not bloat every event.
        result: Box<GeneratedResult>,
    },
    GenerationFailed {
        message: String,
    },
    ExportFinished {
        kind: ExportKind,
        outcome: Result<PathBuf, String>,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoEvent {
    Message(String),
    StillWaiting,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::StillWaiting => {
                "Still waiting for the model to answer (requests cannot be cancelled)…".to_string()
            }
        }
    }
}
