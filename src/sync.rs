//! Zoom and selection synchronization between the drawing canvas and the
//! final-mask canvas.
//!
//! Both canvases are updated in full before either is asked to redraw, so a
//! selection never shows one canvas zoomed and the other not.

use serde::{Deserialize, Serialize};

use crate::constants::zoom;
use crate::contour::{ContourId, MaskId};
use crate::geometry::{BoundingBox, Point};
use crate::transform::{ZoomState, clamp_zoom};

/// The two synchronized canvases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasKind {
    Drawing,
    FinalMask,
}

/// Reference to a selectable contour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionRef {
    /// A segmentation candidate by mask and position.
    Candidate { mask_id: MaskId, index: usize },
    /// A contour of the final mask.
    Final { contour_id: ContourId },
}

/// Defers redraws until the canvas image is decoded.
///
/// Requests made before [`mark_ready`](Self::mark_ready) are remembered and
/// produce exactly one frame once the image is ready. Several requests
/// between frames collapse into one.
#[derive(Debug, Clone, Default)]
pub struct RedrawScheduler {
    ready: bool,
    pending: bool,
    frames: u64,
}

impl RedrawScheduler {
    pub fn request(&mut self) {
        self.pending = true;
    }

    /// The image finished decoding. Returns true if a redraw is now due.
    pub fn mark_ready(&mut self) -> bool {
        self.ready = true;
        self.pending
    }

    /// A new image is loading: nothing can be drawn until it is ready.
    pub fn reset(&mut self) {
        self.ready = false;
        self.pending = false;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether a frame should be drawn now.
    pub fn is_due(&self) -> bool {
        self.ready && self.pending
    }

    /// Consume the pending request if a frame can be drawn.
    pub fn take(&mut self) -> bool {
        if !self.is_due() {
            return false;
        }
        self.pending = false;
        self.frames += 1;
        true
    }

    /// Frames handed out so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Zoom, selection and redraw state of one canvas.
#[derive(Debug, Clone)]
pub struct CanvasState {
    pub kind: CanvasKind,
    pub zoom: ZoomState,
    pub selected: Option<SelectionRef>,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub redraw: RedrawScheduler,
}

impl CanvasState {
    pub fn new(kind: CanvasKind, min_zoom: f32, max_zoom: f32) -> Self {
        Self {
            kind,
            zoom: ZoomState::reset(),
            selected: None,
            min_zoom,
            max_zoom,
            redraw: RedrawScheduler::default(),
        }
    }
}

/// Result of a synchronization step: the zoom both canvases now share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncUpdate {
    pub zoom: ZoomState,
    /// Whether both canvases can draw immediately.
    pub immediate: bool,
}

/// Keeps the drawing and final-mask canvases aligned.
#[derive(Debug, Clone)]
pub struct ZoomSelectionSync {
    drawing: CanvasState,
    final_mask: CanvasState,
    fit_margin: f32,
}

impl ZoomSelectionSync {
    pub fn new(drawing_limits: (f32, f32), final_min: f32, fit_margin: f32) -> Self {
        Self {
            drawing: CanvasState::new(CanvasKind::Drawing, drawing_limits.0, drawing_limits.1),
            final_mask: CanvasState::new(CanvasKind::FinalMask, final_min, f32::INFINITY),
            fit_margin,
        }
    }

    pub fn canvas(&self, kind: CanvasKind) -> &CanvasState {
        match kind {
            CanvasKind::Drawing => &self.drawing,
            CanvasKind::FinalMask => &self.final_mask,
        }
    }

    pub fn canvas_mut(&mut self, kind: CanvasKind) -> &mut CanvasState {
        match kind {
            CanvasKind::Drawing => &mut self.drawing,
            CanvasKind::FinalMask => &mut self.final_mask,
        }
    }

    pub fn selection(&self) -> Option<&SelectionRef> {
        self.drawing.selected.as_ref()
    }

    /// Zoom range both canvases accept.
    fn shared_range(&self) -> (f32, f32) {
        (
            self.drawing.min_zoom.max(self.final_mask.min_zoom),
            self.drawing.max_zoom.min(self.final_mask.max_zoom),
        )
    }

    /// Select a contour given its bounding box as image fractions.
    pub fn select(&mut self, selection: SelectionRef, fraction_bbox: &BoundingBox) -> SyncUpdate {
        let (min, max) = self.shared_range();
        let zoom = ZoomState::fit_fraction_box(fraction_bbox, self.fit_margin, min, max);
        log::debug!(
            "Selected {:?}: zoom {:.2}x at ({:.3}, {:.3})",
            selection,
            zoom.level,
            zoom.center.x,
            zoom.center.y
        );
        self.apply(zoom, Some(selection))
    }

    /// Clear the selection and return both canvases to the reset view,
    /// redrawing immediately.
    pub fn deselect(&mut self) -> SyncUpdate {
        log::debug!("Selection cleared");
        self.apply(ZoomState::reset(), None)
    }

    /// Apply a zoom chosen outside the canvases, e.g. by a results table.
    pub fn apply_zoom(&mut self, level: f32, center: Point) -> SyncUpdate {
        let (min, max) = self.shared_range();
        let level = clamp_zoom(level, min, max);
        let center = Point::new(center.x.clamp(0.0, 1.0), center.y.clamp(0.0, 1.0));
        let selection = self.drawing.selected.clone();
        self.apply(ZoomState::new(level, center), selection)
    }

    /// Point the selection at a different reference without moving either
    /// canvas, e.g. when candidate indices shift after a deletion.
    pub fn retarget(&mut self, selection: SelectionRef) {
        self.drawing.selected = Some(selection.clone());
        self.final_mask.selected = Some(selection);
    }

    /// Record a zoom change made on one canvas alone (wheel or pan).
    pub fn update_local(&mut self, kind: CanvasKind, zoom: ZoomState) {
        let canvas = self.canvas_mut(kind);
        canvas.zoom = zoom;
        canvas.redraw.request();
    }

    /// The active image changed: selection and zoom reset, and neither
    /// canvas may draw until its new image is ready.
    pub fn reset_for_image(&mut self) {
        for canvas in [&mut self.drawing, &mut self.final_mask] {
            canvas.zoom = ZoomState::reset();
            canvas.selected = None;
            canvas.redraw.reset();
        }
    }

    /// Request a redraw of both canvases.
    pub fn request_redraw(&mut self) {
        self.drawing.redraw.request();
        self.final_mask.redraw.request();
    }

    /// Signal that a canvas's image decoded. Returns true if it should draw.
    pub fn image_ready(&mut self, kind: CanvasKind) -> bool {
        self.canvas_mut(kind).redraw.mark_ready()
    }

    /// Take the zoom to draw with if the canvas has a frame due.
    pub fn take_redraw(&mut self, kind: CanvasKind) -> Option<ZoomState> {
        let canvas = self.canvas_mut(kind);
        canvas.redraw.take().then_some(canvas.zoom)
    }

    fn apply(&mut self, zoom: ZoomState, selection: Option<SelectionRef>) -> SyncUpdate {
        // Update both canvases first, then request both redraws.
        for canvas in [&mut self.drawing, &mut self.final_mask] {
            canvas.zoom = zoom;
            canvas.selected = selection.clone();
        }
        self.request_redraw();
        SyncUpdate {
            zoom,
            immediate: self.drawing.redraw.is_due() && self.final_mask.redraw.is_due(),
        }
    }
}

impl Default for ZoomSelectionSync {
    fn default() -> Self {
        Self::new((zoom::MIN, zoom::MAX), zoom::FINAL_MIN, zoom::FIT_MARGIN)
    }
}
