use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const KEYS: &[(&str, &[(&str, &str)])] = &[
    (
        "Anywhere:",
        &[
            ("Tab / Shift-Tab", "Move focus"),
            ("Ctrl-G / F5", "Generate"),
            ("Ctrl-T / F2", "Switch 2D / 3D puzzle"),
            ("F1", "Show this help"),
            ("Ctrl-C", "Quit"),
        ],
    ),
    (
        "Prompt:",
        &[
            ("Enter", "Generate"),
            ("Ctrl-U", "Clear prompt"),
        ],
    ),
    (
        "Settings:",
        &[
            ("↑/↓ or j/k", "Select field"),
            ("←/→ or -/+", "Step numeric value"),
            ("Enter", "Edit / apply"),
            ("Esc", "Cancel edit"),
        ],
    ),
    (
        "Preview:",
        &[
            ("+ / - / 0", "Zoom in / out / reset"),
            ("v", "Technical / simulation view"),
            ("s", "Export SVG"),
            ("p", "Export PDF preview"),
            ("y", "Copy exported path"),
            ("c", "Copy SVG markup"),
            ("q", "Quit"),
        ],
    ),
];

fn help_lines(log_path: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (section, keys) in KEYS {
        lines.push(Line::from(*section));
        for (key, what) in *keys {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{key:<16}"), Style::default().fg(Color::Magenta)),
                Span::raw(*what),
            ]));
        }
        lines.push(Line::from(""));
    }
    if let Some(path) = log_path {
        lines.push(Line::from("Log file:"));
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(path.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }
    lines
}

pub fn draw_help(area: Rect, f: &mut Frame, log_path: Option<&str>) {
    let lines = help_lines(log_path);
    let height = (lines.len() as u16 + 2).min(area.height);
    let width = 56.min(area.width);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help (any key to close)"),
        ),
        popup,
    );
}
