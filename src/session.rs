//! Generation session state.
//!
//! Holds what the user is composing (prompt, mode, settings) and the outcome of
//! the last generation. The UI owns one `Session`; the controller never touches it.

use crate::model::{AppMode, GeneratedResult, GenerationRequest, GeneratorSettings};

#[derive(Debug, Clone, Default)]
pub struct Session {
    prompt: String,
    mode: AppMode,
    settings: GeneratorSettings,
    loading: bool,
    result: Option<GeneratedResult>,
    error: Option<String>,
}

impl Session {
    pub fn new(prompt: String, mode: AppMode, settings: GeneratorSettings) -> Self {
        Self {
            prompt,
            mode,
            settings,
            ..Default::default()
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut GeneratorSettings {
        &mut self.settings
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn result(&self) -> Option<&GeneratedResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_mode(&mut self, mode: AppMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggle());
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn push_char(&mut self, c: char) {
        self.prompt.push(c);
    }

    pub fn pop_char(&mut self) {
        self.prompt.pop();
    }

    pub fn clear_prompt(&mut self) {
        self.set_prompt(String::new());
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && !self.prompt.trim().is_empty()
    }

    /// Start a generation: mark loading, drop the previous outcome and snapshot
    /// the inputs. Returns `None` (and changes nothing) when submitting is not allowed.
    pub fn submit(&mut self) -> Option<GenerationRequest> {
        if !self.can_submit() {
            return None;
        }
        self.loading = true;
        self.error = None;
        self.result = None;
        Some(GenerationRequest {
            prompt: self.prompt.clone(),
            mode: self.mode,
            settings: self.settings.clone(),
        })
    }

    /// Record the outcome of the in-flight generation. Ignored when nothing is in flight.
    pub fn complete(&mut self, outcome: Result<GeneratedResult, String>) {
        if !self.loading {
            return;
        }
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(message) => self.error = Some(message),
        }
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_result() -> GeneratedResult {
        GeneratedResult {
            svg_content: r#"<svg xmlns="http://www.w3.org/2000/svg" width="10mm" height="10mm"/>"#
                .into(),
            description: "square".into(),
            width: "10mm".into(),
            height: "10mm".into(),
        }
    }

    #[test]
    fn empty_or_blank_prompt_cannot_submit() {
        let mut s = Session::default();
        assert!(s.submit().is_none());
        s.set_prompt("   \n");
        assert!(s.submit().is_none());
        assert!(!s.is_loading());
    }

    #[test]
    fn submit_sets_loading_and_snapshots_inputs() {
        let mut s = Session::new("a box".into(), AppMode::ThreeDPuzzle, Default::default());
        let req = s.submit().unwrap();
        assert!(s.is_loading());
        assert_eq!(req.prompt, "a box");
        assert_eq!(req.mode, AppMode::ThreeDPuzzle);

        // Single flight: a second submit is refused while loading.
        assert!(s.submit().is_none());
    }

    #[test]
    fn success_stores_result_and_clears_loading_once() {
        let mut s = Session::new("coaster".into(), AppMode::TwoD, Default::default());
        s.submit().unwrap();
        s.complete(Ok(sample_result()));
        assert!(!s.is_loading());
        assert_eq!(s.result(), Some(&sample_result()));
        assert_eq!(s.error(), None);

        // A late duplicate completion does not change anything.
        s.complete(Err("late".into()));
        assert_eq!(s.result(), Some(&sample_result()));
        assert_eq!(s.error(), None);
    }

    #[test]
    fn failure_keeps_result_empty_and_sets_error() {
        let mut s = Session::new("coaster".into(), AppMode::TwoD, Default::default());
        s.submit().unwrap();
        s.complete(Ok(sample_result()));
        s.submit().unwrap();
        assert_eq!(s.result(), None);
        s.complete(Err("boom".into()));
        assert!(!s.is_loading());
        assert_eq!(s.result(), None);
        assert_eq!(s.error(), Some("boom"));
    }

    #[test]
    fn editing_inputs_does_not_touch_displayed_result() {
        let mut s = Session::new("coaster".into(), AppMode::TwoD, Default::default());
        s.submit().unwrap();
        s.complete(Ok(sample_result()));

        s.settings_mut().material_thickness = 6.0;
        s.settings_mut().cut_color = "#00FF00".into();
        s.toggle_mode();
        s.set_prompt("something else");

        assert_eq!(s.result(), Some(&sample_result()));
    }
}
