//! Global constants for the canvas core.

/// Zoom limits and step factors for the drawing canvas.
pub mod zoom {
    /// Smallest zoom level reachable on the drawing canvas.
    pub const MIN: f32 = 0.1;
    /// Largest zoom level reachable on the drawing canvas.
    pub const MAX: f32 = 5.0;
    /// Smallest zoom level on the final-mask canvas.
    pub const FINAL_MIN: f32 = 1.0;
    /// Multiplier applied per wheel notch when zooming in.
    pub const IN_FACTOR: f32 = 1.1;
    /// Multiplier applied per wheel notch when zooming out.
    pub const OUT_FACTOR: f32 = 0.9;
    /// Padding factor around a contour's bounding box when zooming to it.
    pub const FIT_MARGIN: f32 = 1.2;
}

/// Rendering constants.
pub mod render {
    /// Index badges are only drawn below this zoom level.
    pub const BADGE_ZOOM_THRESHOLD: f32 = 5.0;
    /// Badge font size in screen pixels.
    pub const BADGE_FONT_SIZE: f32 = 12.0;
    /// Horizontal and vertical padding around badge text in screen pixels.
    pub const BADGE_PADDING: f32 = 4.0;
    /// Corner radius of the badge background in screen pixels.
    pub const BADGE_RADIUS: f32 = 3.0;
    /// Approximate glyph advance relative to the font size.
    pub const GLYPH_ADVANCE: f32 = 0.6;
    /// Alpha of the darkening layer around a spotlighted contour.
    pub const SPOTLIGHT_ALPHA: f32 = 0.6;
    /// Alpha of the uniform wash when nothing is spotlighted.
    pub const DIM_ALPHA: f32 = 0.15;
    /// Radius of a rendered point prompt in screen pixels.
    pub const PROMPT_POINT_RADIUS: f32 = 5.0;
}

/// Rounding precision for exported normalized coordinates.
pub const EXPORT_DECIMALS: i32 = 4;

/// Minimum number of points for a closed contour or polygon.
pub const MIN_CLOSED_POINTS: usize = 3;

/// Minimum number of points before a polygon prompt can be committed.
pub const MIN_POLYGON_POINTS: usize = 2;
