use crate::model::{AppEvent, ExportKind, RunConfig};
use crate::session::Session;
use crate::settings::SettingsForm;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Instant;

use super::preview::PreviewCache;

pub const ZOOM_MIN: f32 = 0.5;
pub const ZOOM_MAX: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Prompt,
    Settings,
    Preview,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Prompt => Focus::Settings,
            Focus::Settings => Focus::Preview,
            Focus::Preview => Focus::Prompt,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Prompt => Focus::Preview,
            Focus::Settings => Focus::Prompt,
            Focus::Preview => Focus::Settings,
        }
    }
}

/// How the preview pane dresses the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewSkin {
    /// Grey grid backdrop, white sheet, design drawn as-is.
    Technical,
    /// Wood backdrop, design multiplied onto a lighter wood sheet.
    Simulation,
}

impl PreviewSkin {
    pub fn toggle(self) -> Self {
        match self {
            PreviewSkin::Technical => PreviewSkin::Simulation,
            PreviewSkin::Simulation => PreviewSkin::Technical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PreviewSkin::Technical => "Technical",
            PreviewSkin::Simulation => "Simulation",
        }
    }
}

pub struct UiState {
    pub session: Session,
    pub form: SettingsForm,
    pub focus: Focus,
    pub show_help: bool,
    pub info: String,
    /// Blocking message; input is swallowed until it is dismissed.
    pub alert: Option<String>,

    pub zoom: f32,
    pub skin: PreviewSkin,
    pub exporting: bool,
    pub last_exported_path: Option<PathBuf>,

    pub model: String,
    pub out_dir: PathBuf,
    pub loading_since: Option<Instant>,
    pub log_path: Option<PathBuf>,

    // Last rasterized preview, reused until svg/size/zoom/skin change.
    pub preview_cache: RefCell<Option<PreviewCache>>,
}

impl UiState {
    pub fn new(cfg: &RunConfig) -> Self {
        Self {
            session: Session::new(cfg.prompt.clone(), cfg.mode, cfg.settings.clone()),
            form: SettingsForm::default(),
            focus: Focus::Prompt,
            show_help: false,
            info: String::new(),
            alert: None,
            zoom: 1.0,
            skin: PreviewSkin::Technical,
            exporting: false,
            last_exported_path: None,
            model: cfg.api.model.clone(),
            out_dir: cfg.out_dir.clone(),
            loading_since: None,
            log_path: None,
            preview_cache: RefCell::new(None),
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(ZOOM_MAX);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(ZOOM_MIN);
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    /// Record a finished export, either as a status line or as an alert.
    pub fn export_finished(&mut self, kind: ExportKind, outcome: Result<PathBuf, String>) {
        if kind == ExportKind::Pdf {
            self.exporting = false;
        }
        let label = kind.extension().to_uppercase();
        match outcome {
            Ok(path) => {
                self.info = format!("Exported {label}: {} (y to copy path)", path.display());
                self.last_exported_path = Some(path);
            }
            Err(message) => {
                self.alert = Some(format!("{label} export failed: {message}"));
            }
        }
    }

    pub fn apply_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::GenerationStarted => {
                self.loading_since = Some(Instant::now());
                self.info = format!("Generating with {}…", self.model);
            }
            AppEvent::GenerationCompleted { result } => {
                self.session.complete(Ok(*result));
                self.loading_since = None;
                self.info = "Design ready".into();
            }
            AppEvent::GenerationFailed { message } => {
                self.session.complete(Err(message));
                self.loading_since = None;
                self.info.clear();
            }
            AppEvent::ExportFinished { kind, outcome } => self.export_finished(kind, outcome),
            AppEvent::Info(info) => self.info = info.to_message(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_run_config(prompt: &str) -> RunConfig {
    use crate::model::{ApiConfig, AppMode, GeneratorSettings};
    use std::time::Duration;

    RunConfig {
        api: ApiConfig {
            base_url: "http://localhost".into(),
            model: "test-model".into(),
            api_key: "k".into(),
            timeout: Duration::from_secs(1),
            thinking_budget: 0,
            description_language: "English".into(),
            user_agent: "test".into(),
        },
        prompt: prompt.into(),
        mode: AppMode::TwoD,
        settings: GeneratorSettings::default(),
        out_dir: std::env::temp_dir(),
        generate_on_launch: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::sample_result;
    use crate::model::InfoEvent;

    #[test]
    fn zoom_is_clamped_to_range() {
        let mut state = UiState::new(&test_run_config(""));
        for _ in 0..20 {
            state.zoom_in();
        }
        assert_eq!(state.zoom, ZOOM_MAX);
        assert_eq!(state.zoom_percent(), 300);
        for _ in 0..20 {
            state.zoom_out();
        }
        assert_eq!(state.zoom, ZOOM_MIN);
        state.reset_zoom();
        assert_eq!(state.zoom_percent(), 100);
    }

    #[test]
    fn generation_events_drive_the_session() {
        let mut state = UiState::new(&test_run_config("tag"));
        state.session.submit().unwrap();
        state.apply_event(AppEvent::GenerationStarted);
        assert!(state.loading_since.is_some());
        state.apply_event(AppEvent::GenerationCompleted {
            result: Box::new(sample_result()),
        });
        assert!(!state.session.is_loading());
        assert_eq!(state.session.result(), Some(&sample_result()));
        assert!(state.loading_since.is_none());
    }

    #[test]
    fn failed_generation_sets_error() {
        let mut state = UiState::new(&test_run_config("tag"));
        state.session.submit().unwrap();
        state.apply_event(AppEvent::GenerationFailed {
            message: "boom".into(),
        });
        assert_eq!(state.session.error(), Some("boom"));
        assert!(state.session.result().is_none());
    }

    #[test]
    fn pdf_export_clears_exporting_on_success_and_failure() {
        let mut state = UiState::new(&test_run_config(""));
        state.exporting = true;
        state.apply_event(AppEvent::ExportFinished {
            kind: ExportKind::Pdf,
            outcome: Ok(PathBuf::from("/tmp/x.pdf")),
        });
        assert!(!state.exporting);
        assert!(state.alert.is_none());
        assert_eq!(state.last_exported_path, Some(PathBuf::from("/tmp/x.pdf")));

        state.exporting = true;
        state.apply_event(AppEvent::ExportFinished {
            kind: ExportKind::Pdf,
            outcome: Err("no space".into()),
        });
        assert!(!state.exporting);
        assert_eq!(state.alert.as_deref(), Some("PDF export failed: no space"));
    }

    #[test]
    fn info_events_update_status_line() {
        let mut state = UiState::new(&test_run_config(""));
        state.apply_event(AppEvent::Info(InfoEvent::Message("hello".into())));
        assert_eq!(state.info, "hello");
    }
}
