//! Laser settings editor.
//!
//! Form binding over [`GeneratorSettings`]. Validation is limited to what an
//! input field would enforce: hex colors, and numeric step/min constraints.

use crate::model::GeneratorSettings;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("invalid color {0:?}, expected #RGB or #RRGGBB")]
    InvalidColor(String),
    #[error("{field}: {value:?} is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must be at least {min} mm (got {value})")]
    BelowMinimum {
        field: &'static str,
        min: f64,
        value: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    CutColor,
    EngraveColor,
    CutStrokeWidth,
    MaterialThickness,
}

impl SettingsField {
    pub const ALL: [SettingsField; 4] = [
        SettingsField::CutColor,
        SettingsField::EngraveColor,
        SettingsField::CutStrokeWidth,
        SettingsField::MaterialThickness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::CutColor => "Cut color",
            SettingsField::EngraveColor => "Engrave color",
            SettingsField::CutStrokeWidth => "Cut stroke width (mm)",
            SettingsField::MaterialThickness => "Material thickness (mm)",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SettingsField::CutColor => SettingsField::EngraveColor,
            SettingsField::EngraveColor => SettingsField::CutStrokeWidth,
            SettingsField::CutStrokeWidth => SettingsField::MaterialThickness,
            SettingsField::MaterialThickness => SettingsField::CutColor,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::CutColor => SettingsField::MaterialThickness,
            SettingsField::EngraveColor => SettingsField::CutColor,
            SettingsField::CutStrokeWidth => SettingsField::EngraveColor,
            SettingsField::MaterialThickness => SettingsField::CutStrokeWidth,
        }
    }

    /// `(step, min)` for numeric fields.
    pub fn numeric_constraint(self) -> Option<(f64, f64)> {
        match self {
            SettingsField::CutStrokeWidth => Some((0.01, 0.01)),
            SettingsField::MaterialThickness => Some((0.1, 0.1)),
            _ => None,
        }
    }

    pub fn display_value(self, settings: &GeneratorSettings) -> String {
        match self {
            SettingsField::CutColor => settings.cut_color.clone(),
            SettingsField::EngraveColor => settings.engrave_color.clone(),
            SettingsField::CutStrokeWidth => format!("{:.2}", settings.cut_stroke_width),
            SettingsField::MaterialThickness => format!("{:.1}", settings.material_thickness),
        }
    }

    /// Parse and validate `raw` for this field, then store it.
    pub fn apply(self, settings: &mut GeneratorSettings, raw: &str) -> Result<(), SettingsError> {
        match self {
            SettingsField::CutColor => settings.cut_color = normalize_color(raw)?,
            SettingsField::EngraveColor => settings.engrave_color = normalize_color(raw)?,
            SettingsField::CutStrokeWidth => {
                settings.cut_stroke_width = parse_length(self, raw)?;
            }
            SettingsField::MaterialThickness => {
                settings.material_thickness = parse_length(self, raw)?;
            }
        }
        Ok(())
    }
}

/// Accept `#RGB` / `#RRGGBB` (leading `#` optional) and return `#RRGGBB` in upper case.
pub fn normalize_color(raw: &str) -> Result<String, SettingsError> {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SettingsError::InvalidColor(raw.to_string()));
    }
    let full = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        _ => return Err(SettingsError::InvalidColor(raw.to_string())),
    };
    Ok(format!("#{}", full.to_ascii_uppercase()))
}

fn parse_length(field: SettingsField, raw: &str) -> Result<f64, SettingsError> {
    let value: f64 = raw
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| SettingsError::NotANumber {
            field: field.label(),
            value: raw.to_string(),
        })?;
    if let Some((_, min)) = field.numeric_constraint() {
        if value < min {
            return Err(SettingsError::BelowMinimum {
                field: field.label(),
                min,
                value,
            });
        }
    }
    Ok(value)
}

fn round_to_step(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

impl GeneratorSettings {
    /// Check values coming from the CLI or the config file.
    pub fn validate(&self) -> Result<(), SettingsError> {
        normalize_color(&self.cut_color)?;
        normalize_color(&self.engrave_color)?;
        for field in [SettingsField::CutStrokeWidth, SettingsField::MaterialThickness] {
            let value = match field {
                SettingsField::CutStrokeWidth => self.cut_stroke_width,
                _ => self.material_thickness,
            };
            parse_length(field, &value.to_string())?;
        }
        Ok(())
    }
}

/// Editing state for the settings panel.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub selected: SettingsField,
    /// Text being typed for the selected field, if an edit is in progress.
    pub buffer: Option<String>,
}

impl Default for SettingsForm {
    fn default() -> Self {
        Self {
            selected: SettingsField::CutColor,
            buffer: None,
        }
    }
}

impl SettingsForm {
    pub fn is_editing(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn select_next(&mut self) {
        self.buffer = None;
        self.selected = self.selected.next();
    }

    pub fn select_prev(&mut self) {
        self.buffer = None;
        self.selected = self.selected.prev();
    }

    pub fn begin_edit(&mut self, settings: &GeneratorSettings) {
        self.buffer = Some(self.selected.display_value(settings));
    }

    pub fn input_char(&mut self, c: char) {
        if let Some(buf) = self.buffer.as_mut() {
            buf.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(buf) = self.buffer.as_mut() {
            buf.pop();
        }
    }

    pub fn cancel(&mut self) {
        self.buffer = None;
    }

    /// Validate and store the buffer. On error the buffer is kept so the user can fix it.
    pub fn commit(&mut self, settings: &mut GeneratorSettings) -> Result<(), SettingsError> {
        let Some(raw) = self.buffer.as_deref() else {
            return Ok(());
        };
        self.selected.apply(settings, raw)?;
        self.buffer = None;
        Ok(())
    }

    /// Increase the selected numeric field by one step. No-op on color fields.
    pub fn step_up(&self, settings: &mut GeneratorSettings) {
        self.step(settings, 1.0);
    }

    /// Decrease the selected numeric field by one step, never below its minimum.
    pub fn step_down(&self, settings: &mut GeneratorSettings) {
        self.step(settings, -1.0);
    }

    fn step(&self, settings: &mut GeneratorSettings, direction: f64) {
        let Some((step, min)) = self.selected.numeric_constraint() else {
            return;
        };
        let value = match self.selected {
            SettingsField::CutStrokeWidth => &mut settings.cut_stroke_width,
            SettingsField::MaterialThickness => &mut settings.material_thickness,
            _ => return,
        };
        *value = round_to_step(*value + direction * step, step).max(min);
    }
}
