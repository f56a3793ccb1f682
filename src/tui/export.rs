use crate::model::ExportKind;
use anyhow::{anyhow, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Write the current design's SVG and report the outcome on the state.
/// Returns `false` when there is nothing to export.
pub fn export_svg(state: &mut UiState) -> bool {
    let Some(result) = state.session.result() else {
        return false;
    };
    let outcome = crate::export::svg::export_svg(result, &state.out_dir).map_err(|e| {
        tracing::error!(error = %format!("{e:#}"), "SVG export failed");
        format!("{e:#}")
    });
    state.export_finished(ExportKind::Svg, outcome);
    true
}

/// Start a clipboard thread that owns each `arboard::Clipboard` for a while after
/// setting it; on Linux the contents vanish as soon as the owner is dropped.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

/// Copy the last exported file path.
pub fn copy_last_path(state: &mut UiState) {
    let Some(path) = state.last_exported_path.as_ref() else {
        state.info = "Nothing exported yet".into();
        return;
    };
    let text = path.display().to_string();
    state.info = match copy_to_clipboard(&text) {
        Ok(()) => format!("Copied path: {text}"),
        Err(e) => format!("Copy failed: {e:#}"),
    };
}

/// Copy the raw SVG markup of the current design.
pub fn copy_svg_markup(state: &mut UiState) {
    let Some(result) = state.session.result() else {
        state.info = "No design to copy".into();
        return;
    };
    let bytes = result.svg_content.len();
    state.info = match copy_to_clipboard(&result.svg_content) {
        Ok(()) => format!("Copied SVG markup ({bytes} bytes)"),
        Err(e) => format!("Copy failed: {e:#}"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::sample_result;
    use crate::export::test_dir;
    use crate::tui::state::test_run_config;

    #[test]
    fn svg_export_without_design_does_nothing() {
        let mut state = UiState::new(&test_run_config(""));
        assert!(!export_svg(&mut state));
        assert!(state.last_exported_path.is_none());
    }

    #[test]
    fn svg_export_writes_file_and_remembers_path() {
        let dir = test_dir("tui-svg");
        let mut cfg = test_run_config("tag");
        cfg.out_dir = dir.clone();
        let mut state = UiState::new(&cfg);
        state.session.submit().unwrap();
        state.session.complete(Ok(sample_result()));

        assert!(export_svg(&mut state));
        let path = state.last_exported_path.clone().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            sample_result().svg_content
        );
        assert!(state.info.starts_with("Exported SVG"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn svg_export_failure_raises_alert() {
        let dir = test_dir("tui-svg-bad");
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let mut cfg = test_run_config("tag");
        cfg.out_dir = blocker;
        let mut state = UiState::new(&cfg);
        state.session.submit().unwrap();
        state.session.complete(Ok(sample_result()));

        assert!(export_svg(&mut state));
        assert!(state.alert.as_deref().unwrap().starts_with("SVG export failed"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn copy_path_without_export_reports_it() {
        let mut state = UiState::new(&test_run_config(""));
        copy_last_path(&mut state);
        assert_eq!(state.info, "Nothing exported yet");
    }
}
