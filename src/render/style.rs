//! Contour styling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color_utils::{Color, name_hash};
use crate::constants::render;
use crate::prompt::Label;

/// Resolves the display color of a label.
pub trait LabelStyleProvider {
    fn color(&self, label: Label, label_name: &str) -> Color;
}

/// Named label colors with a golden-angle fallback for unknown labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelPalette {
    #[serde(default)]
    pub named: HashMap<String, Color>,
}

impl LabelPalette {
    pub fn with_color(mut self, label_name: impl Into<String>, color: Color) -> Self {
        self.named.insert(label_name.into(), color);
        self
    }
}

impl LabelStyleProvider for LabelPalette {
    fn color(&self, label: Label, label_name: &str) -> Color {
        if let Some(color) = self.named.get(label_name) {
            return *color;
        }
        if label_name.is_empty() {
            Color::for_index(label.0)
        } else {
            Color::for_index(name_hash(label_name))
        }
    }
}

/// Tunable rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub badge_zoom_threshold: f32,
    pub spotlight_alpha: f32,
    pub dim_alpha: f32,
    pub line_width: f32,
    pub selected_line_width: f32,
    pub fill_alpha: f32,
    pub selected_fill_alpha: f32,
    pub glow_blur: f32,
    /// Stroke contours with fewer than three points as open paths.
    pub show_open_paths: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            badge_zoom_threshold: render::BADGE_ZOOM_THRESHOLD,
            spotlight_alpha: render::SPOTLIGHT_ALPHA,
            dim_alpha: render::DIM_ALPHA,
            line_width: 1.5,
            selected_line_width: 3.0,
            fill_alpha: 0.2,
            selected_fill_alpha: 0.35,
            glow_blur: 10.0,
            show_open_paths: true,
        }
    }
}

/// Shadow used to make a selected contour glow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glow {
    pub color: Color,
    pub blur: f32,
}

/// Resolved appearance of one contour. Widths are in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourStyle {
    pub line_width: f32,
    pub stroke: Color,
    pub fill: Color,
    pub glow: Option<Glow>,
}

/// Style for a contour given its selection state and label.
pub fn contour_style(
    selected: bool,
    label: Label,
    label_name: &str,
    labels: &dyn LabelStyleProvider,
    settings: &RenderSettings,
) -> ContourStyle {
    let base = labels.color(label, label_name);
    if selected {
        ContourStyle {
            line_width: settings.selected_line_width,
            stroke: base,
            fill: base.with_alpha(settings.selected_fill_alpha),
            glow: Some(Glow {
                color: base,
                blur: settings.glow_blur,
            }),
        }
    } else {
        ContourStyle {
            line_width: settings.line_width,
            stroke: base.with_alpha(0.9),
            fill: base.with_alpha(settings.fill_alpha),
            glow: None,
        }
    }
}

/// Color for a prompt glyph.
pub fn prompt_color(label: Label) -> Color {
    match label {
        Label::FOREGROUND => Color::FOREGROUND,
        Label::BACKGROUND => Color::BACKGROUND,
        Label(class) => Color::for_index(class),
    }
}
