//! Screen/image coordinate mathematics.
//!
//! The drawing canvas renders with `translate(pan)` followed by `scale(zoom)`
//! anchored at the image's top-left corner, so a screen point maps to image
//! space as `(screen - pan) / zoom` and back as `image * zoom + pan`.
//!
//! Two views of the same state exist: [`ViewTransform`] (pan offset in screen
//! pixels plus a zoom level over the fit-to-viewport scale), used while
//! interacting, and [`ZoomState`] (zoom level plus a normalized center), used
//! to synchronize canvases.

use serde::{Deserialize, Serialize};

use crate::constants::zoom;
use crate::geometry::{BoundingBox, ImageSize, Point};

/// Convert a screen point into image-pixel space.
pub fn to_image_space(screen: Point, pan: Point, zoom: f32) -> Point {
    Point::new((screen.x - pan.x) / zoom, (screen.y - pan.y) / zoom)
}

/// Convert an image-pixel point into screen space.
pub fn to_screen_space(image: Point, pan: Point, zoom: f32) -> Point {
    Point::new(image.x * zoom + pan.x, image.y * zoom + pan.y)
}

/// Clamp a zoom level to the given inclusive range.
///
/// An empty range (`min > max`) resolves to `max`, and a NaN bound is ignored.
pub fn clamp_zoom(level: f32, min: f32, max: f32) -> f32 {
    level.max(min).min(max)
}

/// Direction of a wheel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    In,
    Out,
}

impl WheelDirection {
    /// Map a wheel delta to a direction. Negative deltas (scrolling up) zoom in.
    pub fn from_delta(delta_y: f32) -> Option<Self> {
        if delta_y < 0.0 {
            Some(WheelDirection::In)
        } else if delta_y > 0.0 {
            Some(WheelDirection::Out)
        } else {
            None
        }
    }
}

/// Zoom bounds and wheel step factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub in_factor: f32,
    pub out_factor: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: zoom::MIN,
            max: zoom::MAX,
            in_factor: zoom::IN_FACTOR,
            out_factor: zoom::OUT_FACTOR,
        }
    }
}

/// Scale at which the whole image fits the viewport.
///
/// Zoom levels are relative to this scale, so level 1 always shows the full
/// image whatever the viewport and image sizes are.
pub fn fit_scale(viewport: ImageSize, image: ImageSize) -> f32 {
    if viewport.is_empty() || image.is_empty() {
        return 1.0;
    }
    (viewport.width_f() / image.width_f()).min(viewport.height_f() / image.height_f())
}

/// Pan/zoom transform state of the drawing canvas.
///
/// `zoom` is the user-facing level; `base` is the fit scale it multiplies,
/// so image pixels map to screen pixels at `zoom * base`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan: Point,
    pub base: f32,
}

impl ViewTransform {
    pub fn new(zoom: f32, pan: Point) -> Self {
        Self {
            zoom,
            pan,
            base: 1.0,
        }
    }

    /// Create an identity transform (zoom=1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0, Point::default())
    }

    pub fn with_base(mut self, base: f32) -> Self {
        self.base = base;
        self
    }

    /// Image pixel to screen pixel scale.
    pub fn scale(&self) -> f32 {
        self.zoom * self.base
    }

    pub fn to_image(&self, screen: Point) -> Point {
        to_image_space(screen, self.pan, self.scale())
    }

    pub fn to_screen(&self, image: Point) -> Point {
        to_screen_space(image, self.pan, self.scale())
    }

    /// Apply one multiplicative wheel step, clamped to the limits.
    pub fn wheel(&self, direction: WheelDirection, limits: &ZoomLimits) -> ViewTransform {
        let factor = match direction {
            WheelDirection::In => limits.in_factor,
            WheelDirection::Out => limits.out_factor,
        };
        ViewTransform {
            zoom: clamp_zoom(self.zoom * factor, limits.min, limits.max),
            ..*self
        }
    }

    /// Apply a pan delta to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewTransform {
        ViewTransform {
            pan: self.pan.offset(dx, dy),
            ..*self
        }
    }

    /// Express this transform as a zoom level and normalized center.
    ///
    /// The center is the image fraction under the middle of the viewport.
    pub fn to_zoom_state(&self, viewport: ImageSize, image: ImageSize) -> ZoomState {
        if image.is_empty() {
            return ZoomState::reset();
        }
        let mid = Point::new(viewport.width_f() / 2.0, viewport.height_f() / 2.0);
        let center = image.to_fraction(self.to_image(mid));
        ZoomState::new(self.zoom, center)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Zoom level plus the normalized image point shown at the viewport center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    pub level: f32,
    pub center: Point,
}

impl ZoomState {
    pub fn new(level: f32, center: Point) -> Self {
        Self { level, center }
    }

    /// The canonical reset state: level 1, centered.
    pub fn reset() -> Self {
        Self::new(1.0, Point::new(0.5, 0.5))
    }

    pub fn is_reset(&self) -> bool {
        *self == Self::reset()
    }

    /// Pan/zoom transform that puts `center` in the middle of the viewport.
    pub fn to_view(&self, viewport: ImageSize, image: ImageSize) -> ViewTransform {
        let base = fit_scale(viewport, image);
        let scale = self.level * base;
        let focus = image.to_pixels(self.center);
        let pan = Point::new(
            viewport.width_f() / 2.0 - focus.x * scale,
            viewport.height_f() / 2.0 - focus.y * scale,
        );
        ViewTransform::new(self.level, pan).with_base(base)
    }

    /// Zoom state that keeps an entire normalized bounding box in view.
    ///
    /// At level `l` the viewport spans at least `1 / l` of the image along
    /// each axis. The box (grown by `margin`) is fit to that span and the
    /// result is clamped to `[min, max]`. Clamping downward only shows more
    /// of the image, and at level 1 the viewport spans the full unit range
    /// around any center inside the box, so the box always stays visible.
    pub fn fit_fraction_box(bbox: &BoundingBox, margin: f32, min: f32, max: f32) -> ZoomState {
        let center = bbox.center();
        let span = (bbox.width.max(bbox.height) * margin).max(f32::EPSILON);
        let level = clamp_zoom(1.0 / span, min, max);
        ZoomState::new(level, center)
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::reset()
    }
}

/// An in-progress pan gesture.
///
/// Records every anchor the pointer passed through so the pan path can be
/// replayed or inspected.
#[derive(Debug, Clone, Default)]
pub struct PanGesture {
    anchors: Vec<Point>,
}

impl PanGesture {
    pub fn start(at: Point) -> Self {
        Self { anchors: vec![at] }
    }

    /// Move the pointer and return the delta since the previous anchor.
    pub fn move_to(&mut self, at: Point) -> (f32, f32) {
        let delta = match self.anchors.last() {
            Some(last) => (at.x - last.x, at.y - last.y),
            None => (0.0, 0.0),
        };
        self.anchors.push(at);
        delta
    }

    pub fn anchors(&self) -> &[Point] {
        &self.anchors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_transform() {
        let t = ViewTransform::identity();
        assert_eq!(t.zoom, 1.0);
        assert_eq!(t.pan, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_to_image_space() {
        let p = to_image_space(Point::new(60.0, 40.0), Point::new(10.0, 20.0), 2.0);
        assert_eq!(p, Point::new(25.0, 10.0));
    }

    #[test]
    fn test_pan_by() {
        let t = ViewTransform::new(1.0, Point::new(10.0, 20.0));
        let new_t = t.pan_by(5.0, -10.0);

        assert_eq!(new_t.zoom, 1.0);
        assert_eq!(new_t.pan, Point::new(15.0, 10.0));
    }

    #[test]
    fn test_wheel_in_and_out() {
        let limits = ZoomLimits::default();
        let t = ViewTransform::identity();
        assert!(approx_eq(t.wheel(WheelDirection::In, &limits).zoom, 1.1));
        assert!(approx_eq(t.wheel(WheelDirection::Out, &limits).zoom, 0.9));
    }

    #[test]
    fn test_wheel_clamps_at_max() {
        let limits = ZoomLimits::default();
        let t = ViewTransform::new(4.8, Point::default());
        assert_eq!(t.wheel(WheelDirection::In, &limits).zoom, 5.0);
    }

    #[test]
    fn test_clamp_zoom_tolerates_empty_range() {
        assert_eq!(clamp_zoom(3.0, 1.0, 5.0), 3.0);
        assert_eq!(clamp_zoom(1.0, 1.0, 0.9), 0.9);
        assert_eq!(clamp_zoom(2.0, f32::NAN, 5.0), 2.0);
    }

    #[test]
    fn test_wheel_direction_from_delta() {
        assert_eq!(WheelDirection::from_delta(-3.0), Some(WheelDirection::In));
        assert_eq!(WheelDirection::from_delta(3.0), Some(WheelDirection::Out));
        assert_eq!(WheelDirection::from_delta(0.0), None);
    }

    #[test]
    fn test_reset_zoom_state_is_identity_view() {
        let size = ImageSize::new(400, 300);
        let view = ZoomState::reset().to_view(size, size);
        assert!(approx_eq(view.zoom, 1.0));
        assert!(approx_eq(view.pan.x, 0.0));
        assert!(approx_eq(view.pan.y, 0.0));
    }

    #[test]
    fn test_zoom_state_view_round_trip() {
        let size = ImageSize::new(400, 300);
        let state = ZoomState::new(2.5, Point::new(0.3, 0.7));
        let back = state.to_view(size, size).to_zoom_state(size, size);
        assert!(approx_eq(back.level, 2.5));
        assert!(approx_eq(back.center.x, 0.3));
        assert!(approx_eq(back.center.y, 0.7));
    }

    #[test]
    fn test_fit_box_keeps_box_visible() {
        let bbox = BoundingBox::new(0.8, 0.1, 0.15, 0.05);
        let state = ZoomState::fit_fraction_box(&bbox, 1.2, 1.0, 5.0);
        let half = 0.5 / state.level;
        assert!(state.center.x - half <= bbox.x);
        assert!(state.center.x + half >= bbox.x + bbox.width);
        assert!(state.center.y - half <= bbox.y);
        assert!(state.center.y + half >= bbox.y + bbox.height);
    }

    #[test]
    fn test_fit_scale_uses_tighter_axis() {
        let scale = fit_scale(ImageSize::new(400, 300), ImageSize::new(4000, 1000));
        assert!(approx_eq(scale, 0.1));
        assert_eq!(fit_scale(ImageSize::default(), ImageSize::new(10, 10)), 1.0);
    }

    #[test]
    fn test_reset_view_fits_large_image() {
        let viewport = ImageSize::new(400, 300);
        let image = ImageSize::new(4000, 3000);
        let view = ZoomState::reset().to_view(viewport, image);
        assert!(approx_eq(view.zoom, 1.0));
        let top_left = view.to_screen(Point::new(0.0, 0.0));
        let bottom_right = view.to_screen(Point::new(4000.0, 3000.0));
        assert!(approx_eq(top_left.x, 0.0) && approx_eq(top_left.y, 0.0));
        assert!(approx_eq(bottom_right.x, 400.0) && approx_eq(bottom_right.y, 300.0));
    }

    #[test]
    fn test_fit_box_visible_when_viewport_differs_from_image() {
        let viewport = ImageSize::new(400, 300);
        let image = ImageSize::new(4000, 3000);
        let bbox = BoundingBox::new(0.1, 0.1, 0.5, 0.5);
        let state = ZoomState::fit_fraction_box(&bbox, 1.2, 1.0, 5.0);
        let view = state.to_view(viewport, image);

        for corner in [
            Point::new(0.1, 0.1),
            Point::new(0.6, 0.1),
            Point::new(0.6, 0.6),
            Point::new(0.1, 0.6),
        ] {
            let screen = view.to_screen(image.to_pixels(corner));
            assert!(screen.x >= 0.0 && screen.x <= 400.0, "{:?}", screen);
            assert!(screen.y >= 0.0 && screen.y <= 300.0, "{:?}", screen);
        }
    }

    #[test]
    fn test_zoom_state_round_trip_with_fit_scale() {
        let viewport = ImageSize::new(800, 600);
        let image = ImageSize::new(320, 480);
        let state = ZoomState::new(2.0, Point::new(0.25, 0.6));
        let back = state.to_view(viewport, image).to_zoom_state(viewport, image);
        assert!(approx_eq(back.level, 2.0));
        assert!(approx_eq(back.center.x, 0.25));
        assert!(approx_eq(back.center.y, 0.6));
    }

    #[test]
    fn test_fit_large_box_clamps_to_min() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let state = ZoomState::fit_fraction_box(&bbox, 1.2, 1.0, 5.0);
        assert_eq!(state.level, 1.0);
        assert_eq!(state.center, Point::new(0.5, 0.5));
    }

    #[test]
    fn test_pan_gesture_records_anchors() {
        let mut gesture = PanGesture::start(Point::new(0.0, 0.0));
        assert_eq!(gesture.move_to(Point::new(5.0, 2.0)), (5.0, 2.0));
        assert_eq!(gesture.move_to(Point::new(7.0, 1.0)), (2.0, -1.0));
        assert_eq!(gesture.anchors().len(), 3);
    }

    proptest! {
        #[test]
        fn screen_image_round_trip(
            x in -2000.0f32..2000.0,
            y in -2000.0f32..2000.0,
            px in -1000.0f32..1000.0,
            py in -1000.0f32..1000.0,
            zoom in 0.1f32..=5.0,
        ) {
            let p = Point::new(x, y);
            let pan = Point::new(px, py);
            let back = to_image_space(to_screen_space(p, pan, zoom), pan, zoom);
            let tol = 1e-3 * (1.0 + x.abs().max(y.abs()));
            prop_assert!((back.x - x).abs() <= tol);
            prop_assert!((back.y - y).abs() <= tol);
        }

        #[test]
        fn wheel_zoom_stays_clamped(steps in proptest::collection::vec(any::<bool>(), 0..200)) {
            let limits = ZoomLimits::default();
            let mut t = ViewTransform::identity();
            for zoom_in in steps {
                let dir = if zoom_in { WheelDirection::In } else { WheelDirection::Out };
                t = t.wheel(dir, &limits);
                prop_assert!(t.zoom >= limits.min && t.zoom <= limits.max);
            }
        }
    }
}
