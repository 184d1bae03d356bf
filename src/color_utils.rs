//! Color type and conversion utilities shared by the renderer and label styling.

use serde::{Deserialize, Serialize};

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const FOREGROUND: Color = Color::rgba(0.2, 0.85, 0.3, 1.0);
    pub const BACKGROUND: Color = Color::rgba(0.9, 0.2, 0.2, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Generate a distinct color for a label index using the golden angle.
    pub fn for_index(index: u32) -> Self {
        let hue = (index as f32 * 137.5) % 360.0;
        let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
        Self::rgba(r, g, b, 1.0)
    }
}

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}

/// Stable hash of a label name, used to spread named labels across the palette.
pub fn name_hash(name: &str) -> u32 {
    // FNV-1a
    name.bytes()
        .fold(0x811c_9dc5_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(0x0100_0193))
}
