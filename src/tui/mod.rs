mod export;
mod help;
mod preview;
mod state;

use crate::engine::GeminiClient;
use crate::model::{AppMode, RunConfig};
use crate::orchestrator::{self, UiCommand};
use crate::settings::{normalize_color, SettingsField};
use anyhow::{Context, Result};
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use help::draw_help;
use preview::draw_preview;
use state::{Focus, UiState};

pub async fn run(cfg: RunConfig) -> Result<()> {
    let client = GeminiClient::new(&cfg.api).context("set up the generation client")?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, event_rx, cmd_tx));

    let res = orchestrator::run_controller(client, cfg.out_dir.clone(), event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    cfg: RunConfig,
    mut event_rx: UnboundedReceiver<crate::model::AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(&cfg);
    state.log_path = crate::logging::log_file_path();
    if cfg.generate_on_launch {
        if let KeyOutcome::Send(cmd) = request_generation(&mut state) {
            let _ = cmd_tx.send(cmd);
        }
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k) {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Send(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyOutcome::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
                dirty = true;
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();

    if state.session.is_loading() || state.exporting {
        eprintln!("Waiting for the running request to finish (it cannot be cancelled)…");
    }
    res
}

/// What the run loop does after a key press.
#[derive(Debug)]
enum KeyOutcome {
    Continue,
    Send(UiCommand),
    Quit,
}

fn request_generation(state: &mut UiState) -> KeyOutcome {
    if state.session.is_loading() {
        state.info = "A generation is already running".into();
        return KeyOutcome::Continue;
    }
    match state.session.submit() {
        Some(req) => {
            tracing::info!(mode = ?req.mode, prompt_len = req.prompt.len(), "generation requested");
            KeyOutcome::Send(UiCommand::Generate(req))
        }
        None => {
            state.info = "Describe what to make first".into();
            state.focus = Focus::Prompt;
            KeyOutcome::Continue
        }
    }
}

fn request_pdf_export(state: &mut UiState) -> KeyOutcome {
    if state.exporting {
        state.info = "PDF export already running".into();
        return KeyOutcome::Continue;
    }
    let Some(result) = state.session.result() else {
        state.info = "No design to export".into();
        return KeyOutcome::Continue;
    };
    let cmd = UiCommand::ExportPdf(Box::new(result.clone()));
    state.exporting = true;
    state.info = "Rendering PDF preview…".into();
    KeyOutcome::Send(cmd)
}

fn toggle_mode(state: &mut UiState) {
    state.session.toggle_mode();
    state.info = format!("Mode: {}", state.session.mode().label());
}

fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyOutcome {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && k.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }
    if state.alert.is_some() {
        if matches!(k.code, KeyCode::Enter | KeyCode::Esc) {
            state.alert = None;
        }
        return KeyOutcome::Continue;
    }
    if state.show_help {
        state.show_help = false;
        return KeyOutcome::Continue;
    }

    match (ctrl, k.code) {
        (true, KeyCode::Char('g')) | (_, KeyCode::F(5)) => return request_generation(state),
        (true, KeyCode::Char('t')) | (_, KeyCode::F(2)) => {
            toggle_mode(state);
            return KeyOutcome::Continue;
        }
        (_, KeyCode::F(1)) => {
            state.show_help = true;
            return KeyOutcome::Continue;
        }
        (_, KeyCode::Tab) => {
            state.form.cancel();
            state.focus = state.focus.next();
            return KeyOutcome::Continue;
        }
        (_, KeyCode::BackTab) => {
            state.form.cancel();
            state.focus = state.focus.prev();
            return KeyOutcome::Continue;
        }
        _ => {}
    }

    match state.focus {
        Focus::Prompt => handle_prompt_key(state, k, ctrl),
        Focus::Settings => handle_settings_key(state, k),
        Focus::Preview => handle_preview_key(state, k),
    }
}

fn handle_prompt_key(state: &mut UiState, k: KeyEvent, ctrl: bool) -> KeyOutcome {
    match k.code {
        KeyCode::Enter => return request_generation(state),
        KeyCode::Char('u') if ctrl => state.session.clear_prompt(),
        KeyCode::Char(c) if !ctrl => state.session.push_char(c),
        KeyCode::Backspace => state.session.pop_char(),
        KeyCode::Esc => state.focus = Focus::Preview,
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_settings_key(state: &mut UiState, k: KeyEvent) -> KeyOutcome {
    if state.form.is_editing() {
        match k.code {
            KeyCode::Enter => match state.form.commit(state.session.settings_mut()) {
                Ok(()) => state.info = format!("{} updated", state.form.selected.label()),
                Err(e) => state.info = e.to_string(),
            },
            KeyCode::Esc => state.form.cancel(),
            KeyCode::Backspace => state.form.backspace(),
            KeyCode::Char(c) => state.form.input_char(c),
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Up | KeyCode::Char('k') => state.form.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => state.form.select_next(),
        KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => {
            state.form.step_up(state.session.settings_mut())
        }
        KeyCode::Left | KeyCode::Char('-') => state.form.step_down(state.session.settings_mut()),
        KeyCode::Enter | KeyCode::Char('e') => state.form.begin_edit(state.session.settings()),
        KeyCode::Char('m') => toggle_mode(state),
        KeyCode::Char('?') => state.show_help = true,
        KeyCode::Char('q') => return KeyOutcome::Quit,
        _ => {}
    }
    KeyOutcome::Continue
}

fn handle_preview_key(state: &mut UiState, k: KeyEvent) -> KeyOutcome {
    match k.code {
        KeyCode::Char('+') | KeyCode::Char('=') => state.zoom_in(),
        KeyCode::Char('-') => state.zoom_out(),
        KeyCode::Char('0') => state.reset_zoom(),
        KeyCode::Char('v') => state.skin = state.skin.toggle(),
        KeyCode::Char('s') => {
            if !export::export_svg(state) {
                state.info = "No design to export".into();
            }
        }
        KeyCode::Char('p') => return request_pdf_export(state),
        KeyCode::Char('y') => export::copy_last_path(state),
        KeyCode::Char('c') => export::copy_svg_markup(state),
        KeyCode::Char('g') => return request_generation(state),
        KeyCode::Char('m') => toggle_mode(state),
        KeyCode::Char('?') => state.show_help = true,
        KeyCode::Char('q') => return KeyOutcome::Quit,
        _ => {}
    }
    KeyOutcome::Continue
}

fn focus_style(state: &UiState, focus: Focus) -> Style {
    if state.focus == focus {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn swatch(hex: &str) -> Option<Color> {
    let hex = normalize_color(hex).ok()?;
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(1)?, channel(3)?, channel(5)?))
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let selected = match state.session.mode() {
        AppMode::TwoD => 0,
        AppMode::ThreeDPuzzle => 1,
    };
    let tabs = Tabs::new(vec![
        Line::from(AppMode::TwoD.label()),
        Line::from(AppMode::ThreeDPuzzle.label()),
    ])
    .select(selected)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("lasercraft · {}", state.model)),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(20)].as_ref())
        .split(chunks[1]);
    draw_sidebar(body[0], f, state);
    draw_preview(body[1], f, state);

    draw_status(chunks[2], f, state);

    if state.show_help {
        let log_path = state.log_path.as_ref().map(|p| p.display().to_string());
        draw_help(chunks[1], f, log_path.as_deref());
    }
    if let Some(msg) = &state.alert {
        draw_alert(area, f, msg);
    }
}

fn draw_sidebar(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let error_height = if state.session.error().is_some() { 5 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(5),
                Constraint::Length(SettingsField::ALL.len() as u16 + 2),
                Constraint::Length(3),
                Constraint::Length(error_height),
            ]
            .as_ref(),
        )
        .split(area);

    draw_prompt(rows[0], f, state);
    draw_settings(rows[1], f, state);
    draw_generate_button(rows[2], f, state);

    if let Some(err) = state.session.error() {
        let p = Paragraph::new(err.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title("Error"),
            );
        f.render_widget(p, rows[3]);
    }
}

fn draw_prompt(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let focused = state.focus == Focus::Prompt;
    let prompt = state.session.prompt();
    let text = if prompt.is_empty() {
        let mut spans = Vec::new();
        if focused {
            spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
        }
        spans.push(Span::styled(
            state.session.mode().placeholder(),
            Style::default().fg(Color::DarkGray),
        ));
        Line::from(spans)
    } else {
        let mut spans = vec![Span::raw(prompt.to_string())];
        if focused {
            spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    };
    let p = Paragraph::new(text).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(state, Focus::Prompt))
            .title(format!("Prompt · {}", state.session.mode().label())),
    );
    f.render_widget(p, area);
}

fn draw_settings(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let focused = state.focus == Focus::Settings;
    let settings = state.session.settings();
    let lines: Vec<Line> = SettingsField::ALL
        .iter()
        .map(|&field| {
            let is_selected = focused && state.form.selected == field;
            let marker = if is_selected { "› " } else { "  " };
            let label_style = if is_selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(format!("{:<22}", field.label()), label_style),
            ];
            match (&state.form.buffer, is_selected) {
                (Some(buf), true) => {
                    spans.push(Span::styled(
                        buf.clone(),
                        Style::default().add_modifier(Modifier::UNDERLINED),
                    ));
                    spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
                }
                _ => {
                    let value = field.display_value(settings);
                    if matches!(field, SettingsField::CutColor | SettingsField::EngraveColor) {
                        if let Some(c) = swatch(&value) {
                            spans.push(Span::styled("██ ", Style::default().fg(c)));
                        }
                    }
                    spans.push(Span::raw(value));
                }
            }
            Line::from(spans)
        })
        .collect();
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(state, Focus::Settings))
            .title("Laser settings"),
    );
    f.render_widget(p, area);
}

fn draw_generate_button(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let (label, style) = if state.session.is_loading() {
        ("Generating…", Style::default().fg(Color::Yellow))
    } else if state.session.can_submit() {
        (
            "Generate design  (Ctrl-G)",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )
    } else {
        ("Generate design  (Ctrl-G)", Style::default().fg(Color::DarkGray))
    };
    let p = Paragraph::new(Line::styled(label, style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(style));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let hints = match state.focus {
        Focus::Prompt => "Enter generate · Tab next · F1 help",
        Focus::Settings if state.form.is_editing() => "Enter apply · Esc cancel",
        Focus::Settings => "↑↓ select · ←→ step · Enter edit · F1 help",
        Focus::Preview => "+/- zoom · v view · s SVG · p PDF · y copy path · F1 help",
    };
    let hint_width = hints.chars().count() as u16;
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(hint_width)].as_ref())
        .split(area);
    f.render_widget(
        Paragraph::new(Line::from(vec![Span::raw(" "), Span::raw(state.info.clone())])),
        cols[0],
    );
    f.render_widget(
        Paragraph::new(Line::styled(hints, Style::default().fg(Color::DarkGray))),
        cols[1],
    );
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, msg: &str) {
    let width = 64.min(area.width);
    let height = 8.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    let p = Paragraph::new(vec![
        Line::from(msg.to_string()),
        Line::from(""),
        Line::styled("Enter / Esc to dismiss", Style::default().fg(Color::Gray)),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Export failed"),
    );
    f.render_widget(p, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::sample_result;
    use crate::model::ExportKind;
    use super::state::{test_run_config, PreviewSkin};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(state: &mut UiState, text: &str) {
        for c in text.chars() {
            handle_key(state, key(KeyCode::Char(c)));
        }
    }

    fn with_result(prompt: &str) -> UiState {
        let mut state = UiState::new(&test_run_config(prompt));
        state.session.submit().unwrap();
        state.session.complete(Ok(sample_result()));
        state
    }

    #[test]
    fn typing_then_enter_submits_a_request() {
        let mut state = UiState::new(&test_run_config(""));
        type_text(&mut state, "box");
        assert_eq!(state.session.prompt(), "box");
        match handle_key(&mut state, key(KeyCode::Enter)) {
            KeyOutcome::Send(UiCommand::Generate(req)) => assert_eq!(req.prompt, "box"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(state.session.is_loading());
        // A second attempt while loading does not produce another request.
        assert!(matches!(handle_key(&mut state, ctrl('g')), KeyOutcome::Continue));
    }

    #[test]
    fn empty_prompt_does_not_submit() {
        let mut state = UiState::new(&test_run_config("   "));
        assert!(matches!(handle_key(&mut state, key(KeyCode::Enter)), KeyOutcome::Continue));
        assert!(!state.session.is_loading());
    }

    #[test]
    fn mode_toggle_keeps_displayed_result() {
        let mut state = with_result("tag");
        handle_key(&mut state, ctrl('t'));
        assert_eq!(state.session.mode(), AppMode::ThreeDPuzzle);
        assert_eq!(state.session.result(), Some(&sample_result()));
    }

    #[test]
    fn settings_keys_step_and_edit() {
        let mut state = UiState::new(&test_run_config(""));
        handle_key(&mut state, key(KeyCode::Tab));
        assert_eq!(state.focus, Focus::Settings);
        handle_key(&mut state, key(KeyCode::Down));
        handle_key(&mut state, key(KeyCode::Down));
        assert_eq!(state.form.selected, SettingsField::CutStrokeWidth);
        for _ in 0..20 {
            handle_key(&mut state, key(KeyCode::Left));
        }
        assert_eq!(state.session.settings().cut_stroke_width, 0.01);

        handle_key(&mut state, key(KeyCode::Up));
        handle_key(&mut state, key(KeyCode::Enter));
        assert!(state.form.is_editing());
        for _ in 0..10 {
            handle_key(&mut state, key(KeyCode::Backspace));
        }
        type_text(&mut state, "#0f0");
        handle_key(&mut state, key(KeyCode::Enter));
        assert!(!state.form.is_editing());
        assert_eq!(state.session.settings().engrave_color, "#00FF00");
    }

    #[test]
    fn invalid_setting_is_rejected_and_kept_for_fixing() {
        let mut state = UiState::new(&test_run_config(""));
        state.focus = Focus::Settings;
        handle_key(&mut state, key(KeyCode::Enter));
        for _ in 0..10 {
            handle_key(&mut state, key(KeyCode::Backspace));
        }
        type_text(&mut state, "red");
        handle_key(&mut state, key(KeyCode::Enter));
        assert!(state.form.is_editing());
        assert_eq!(state.session.settings().cut_color, "#FF0000");
        handle_key(&mut state, key(KeyCode::Esc));
        assert!(!state.form.is_editing());
    }

    #[test]
    fn pdf_export_sets_exporting_once() {
        let mut state = with_result("tag");
        state.focus = Focus::Preview;
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('p'))),
            KeyOutcome::Send(UiCommand::ExportPdf(_))
        ));
        assert!(state.exporting);
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('p'))),
            KeyOutcome::Continue
        ));
        state.export_finished(ExportKind::Pdf, Err("disk full".into()));
        assert!(!state.exporting);
        assert!(state.alert.is_some());
    }

    #[test]
    fn alert_swallows_keys_until_dismissed() {
        let mut state = with_result("tag");
        state.focus = Focus::Preview;
        state.alert = Some("boom".into());
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('q'))),
            KeyOutcome::Continue
        ));
        assert!(state.alert.is_some());
        handle_key(&mut state, key(KeyCode::Esc));
        assert!(state.alert.is_none());
        assert!(matches!(
            handle_key(&mut state, key(KeyCode::Char('q'))),
            KeyOutcome::Quit
        ));
    }

    #[test]
    fn preview_zoom_keys() {
        let mut state = with_result("tag");
        state.focus = Focus::Preview;
        handle_key(&mut state, key(KeyCode::Char('+')));
        assert_eq!(state.zoom_percent(), 125);
        handle_key(&mut state, key(KeyCode::Char('0')));
        assert_eq!(state.zoom_percent(), 100);
        handle_key(&mut state, key(KeyCode::Char('v')));
        assert_eq!(state.skin, PreviewSkin::Simulation);
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let mut state = UiState::new(&test_run_config(""));
        state.show_help = true;
        assert!(matches!(handle_key(&mut state, ctrl('c')), KeyOutcome::Quit));
    }

    #[test]
    fn swatch_parses_short_and_long_hex() {
        assert_eq!(swatch("#f00"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(swatch("#00FF80"), Some(Color::Rgb(0, 255, 128)));
        assert_eq!(swatch("nope"), None);
    }
}
