//! Prompt capture state machine.
//!
//! Pointer, wheel and key events arrive in screen coordinates. The capture
//! converts them through the current [`ViewTransform`] into image-pixel space
//! and turns them into finished [`Prompt`]s according to the active [`Tool`].

use crate::constants::MIN_POLYGON_POINTS;
use crate::geometry::{BoundingBox, ImageSize, Point};
use crate::input::{InputController, Key};
use crate::keybindings::KeyBindings;
use crate::prompt::{
    ExportedPrompt, Label, LabelCounts, Prompt, PromptShape, Tool, export_prompts,
    export_prompts_raw,
};
use crate::transform::{PanGesture, ViewTransform, WheelDirection, ZoomLimits, clamp_zoom};

/// Pointer buttons the canvas distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Current gesture of the capture state machine.
#[derive(Debug, Clone, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// Pan gesture. A polygon interrupted by the pan resumes afterwards.
    PanningOrDragging {
        gesture: PanGesture,
        resume: Option<Vec<Point>>,
    },
    /// Primary button held after placing a point.
    DrawingPoint,
    DrawingBoxOrCircle { start: Point, current: Point },
    DrawingPolygon { points: Vec<Point> },
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CaptureState::Idle)
    }

    pub fn is_panning(&self) -> bool {
        matches!(self, CaptureState::PanningOrDragging { .. })
    }
}

/// What an input event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Nothing visible changed.
    Unchanged,
    /// Preview shape or view transform changed; a redraw is due.
    Redraw,
    /// A prompt was committed.
    PromptAdded,
    /// One or more prompts were removed.
    PromptsRemoved,
}

/// Turns pointer input into labeled prompts.
#[derive(Debug, Clone)]
pub struct PromptCapture {
    state: CaptureState,
    tool: Tool,
    label: Label,
    prompts: Vec<Prompt>,
    counts: LabelCounts,
    view: ViewTransform,
    limits: ZoomLimits,
    input: InputController,
    bindings: KeyBindings,
}

impl PromptCapture {
    /// Create a capture driven by the given input controller.
    pub fn new(input: InputController, limits: ZoomLimits, bindings: KeyBindings) -> Self {
        Self {
            state: CaptureState::Idle,
            tool: Tool::default(),
            label: Label::default(),
            prompts: Vec::new(),
            counts: LabelCounts::default(),
            view: ViewTransform::identity(),
            limits,
            input,
            bindings,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn counts(&self) -> &LabelCounts {
        &self.counts
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn input(&self) -> &InputController {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputController {
        &mut self.input
    }

    /// Replace the view transform (zoom-apply from outside the canvas).
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = ViewTransform {
            zoom: clamp_zoom(view.zoom, self.limits.min, self.limits.max),
            ..view
        };
    }

    // ========================================================================
    // Tool and label selection
    // ========================================================================

    /// Switch tools. An in-progress polygon is committed first; an
    /// in-progress box or circle is abandoned.
    pub fn set_tool(&mut self, tool: Tool) -> CaptureOutcome {
        if tool == self.tool {
            return CaptureOutcome::Unchanged;
        }
        log::debug!("Tool: {} -> {}", self.tool.name(), tool.name());
        self.tool = tool;

        match std::mem::take(&mut self.state) {
            CaptureState::DrawingPolygon { points } => {
                if self.commit_polygon(points) {
                    CaptureOutcome::PromptAdded
                } else {
                    CaptureOutcome::Redraw
                }
            }
            CaptureState::DrawingBoxOrCircle { .. } => CaptureOutcome::Redraw,
            CaptureState::PanningOrDragging { gesture, resume } => {
                // Finish the pan gesture under the new tool, minus the polygon.
                self.state = CaptureState::PanningOrDragging {
                    gesture,
                    resume: None,
                };
                match resume {
                    Some(points) => {
                        if self.commit_polygon(points) {
                            CaptureOutcome::PromptAdded
                        } else {
                            CaptureOutcome::Unchanged
                        }
                    }
                    None => CaptureOutcome::Unchanged,
                }
            }
            CaptureState::Idle | CaptureState::DrawingPoint => CaptureOutcome::Unchanged,
        }
    }

    pub fn set_label(&mut self, label: Label) {
        if label != self.label {
            log::debug!("Prompt label: {:?} -> {:?}", self.label, label);
            self.label = label;
        }
    }

    // ========================================================================
    // Pointer events
    // ========================================================================

    pub fn pointer_down(&mut self, screen: Point, button: PointerButton) -> CaptureOutcome {
        let wants_pan = button == PointerButton::Middle
            || self.tool == Tool::Pan
            || self.input.modifier_held();

        if wants_pan {
            let resume = match std::mem::take(&mut self.state) {
                CaptureState::DrawingPolygon { points } => Some(points),
                _ => None,
            };
            self.state = CaptureState::PanningOrDragging {
                gesture: PanGesture::start(screen),
                resume,
            };
            log::debug!("Pan started at ({:.1}, {:.1})", screen.x, screen.y);
            return CaptureOutcome::Unchanged;
        }

        if button != PointerButton::Primary {
            return CaptureOutcome::Unchanged;
        }

        let at = self.view.to_image(screen);
        match self.tool {
            Tool::Pan => CaptureOutcome::Unchanged,
            Tool::Point => {
                self.push_prompt(PromptShape::Point(at));
                self.state = CaptureState::DrawingPoint;
                CaptureOutcome::PromptAdded
            }
            Tool::Box | Tool::Circle => {
                self.state = CaptureState::DrawingBoxOrCircle {
                    start: at,
                    current: at,
                };
                CaptureOutcome::Redraw
            }
            Tool::Polygon => {
                match &mut self.state {
                    CaptureState::DrawingPolygon { points } => {
                        // The clicks of a double-click land on the last vertex.
                        if points.last() == Some(&at) {
                            return CaptureOutcome::Unchanged;
                        }
                        points.push(at);
                    }
                    _ => {
                        self.state = CaptureState::DrawingPolygon { points: vec![at] };
                        log::debug!("Polygon started at ({:.1}, {:.1})", at.x, at.y);
                    }
                }
                CaptureOutcome::Redraw
            }
        }
    }

    pub fn pointer_move(&mut self, screen: Point) -> CaptureOutcome {
        let at = self.view.to_image(screen);
        match &mut self.state {
            CaptureState::PanningOrDragging { gesture, .. } => {
                let (dx, dy) = gesture.move_to(screen);
                if dx == 0.0 && dy == 0.0 {
                    return CaptureOutcome::Unchanged;
                }
                self.view = self.view.pan_by(dx, dy);
                CaptureOutcome::Redraw
            }
            CaptureState::DrawingBoxOrCircle { current, .. } => {
                *current = at;
                CaptureOutcome::Redraw
            }
            _ => CaptureOutcome::Unchanged,
        }
    }

    pub fn pointer_up(&mut self, screen: Point, button: PointerButton) -> CaptureOutcome {
        match std::mem::take(&mut self.state) {
            CaptureState::PanningOrDragging { gesture, resume } => {
                log::debug!("Pan ended after {} anchors", gesture.anchors().len());
                self.end_pan(resume);
                CaptureOutcome::Unchanged
            }
            CaptureState::DrawingBoxOrCircle { start, .. } if button == PointerButton::Primary => {
                let end = self.view.to_image(screen);
                let shape = match self.tool {
                    Tool::Circle => {
                        let radius = start.distance_to(&end);
                        (radius > 0.0).then_some(PromptShape::Circle {
                            center: start,
                            radius,
                        })
                    }
                    _ => {
                        let area = BoundingBox::from_corners(start, end).area();
                        (area > 0.0).then_some(PromptShape::Box { start, end })
                    }
                };
                match shape {
                    Some(shape) => {
                        self.push_prompt(shape);
                        CaptureOutcome::PromptAdded
                    }
                    None => {
                        log::debug!("Discarded zero-size {} prompt", self.tool.name());
                        CaptureOutcome::Redraw
                    }
                }
            }
            CaptureState::DrawingPoint => CaptureOutcome::Unchanged,
            other => {
                self.state = other;
                CaptureOutcome::Unchanged
            }
        }
    }

    /// Double-click finalizes an in-progress polygon.
    pub fn double_click(&mut self) -> CaptureOutcome {
        match std::mem::take(&mut self.state) {
            CaptureState::DrawingPolygon { points } if points.len() >= MIN_POLYGON_POINTS => {
                self.commit_polygon(points);
                CaptureOutcome::PromptAdded
            }
            other => {
                self.state = other;
                CaptureOutcome::Unchanged
            }
        }
    }

    /// Wheel input zooms only while the modifier is held.
    pub fn wheel(&mut self, delta_y: f32) -> CaptureOutcome {
        if !self.input.modifier_held() {
            return CaptureOutcome::Unchanged;
        }
        let Some(direction) = WheelDirection::from_delta(delta_y) else {
            return CaptureOutcome::Unchanged;
        };
        let zoomed = self.view.wheel(direction, &self.limits);
        if zoomed == self.view {
            return CaptureOutcome::Unchanged;
        }
        self.view = zoomed;
        log::debug!("Zoom: {:.2}x", self.view.zoom);
        CaptureOutcome::Redraw
    }

    // ========================================================================
    // Keyboard
    // ========================================================================

    pub fn key_down(&mut self, key: Key) -> CaptureOutcome {
        if self.input.key_down(key) {
            return CaptureOutcome::Unchanged;
        }
        if key.is_modifier() {
            return CaptureOutcome::Unchanged;
        }
        match key {
            Key::Escape => self.cancel(),
            Key::Enter => self.double_click(),
            Key::Backspace => self.remove_last_vertex(),
            _ => {
                if let Some(tool) = self.bindings.tool_for_key(key) {
                    self.set_tool(tool)
                } else if let Some(label) = self.bindings.label_for_key(key) {
                    self.set_label(label);
                    CaptureOutcome::Unchanged
                } else {
                    CaptureOutcome::Unchanged
                }
            }
        }
    }

    /// Releasing the modifier ends a modifier-driven pan.
    pub fn key_up(&mut self, key: Key) -> CaptureOutcome {
        if !self.input.key_up(key) {
            return CaptureOutcome::Unchanged;
        }
        self.end_modifier_pan()
    }

    /// The canvas lost focus. A held modifier will never see its release.
    pub fn blur(&mut self) -> CaptureOutcome {
        if !self.input.blur() {
            return CaptureOutcome::Unchanged;
        }
        self.end_modifier_pan()
    }

    fn end_modifier_pan(&mut self) -> CaptureOutcome {
        if self.tool == Tool::Pan || !self.state.is_panning() {
            return CaptureOutcome::Unchanged;
        }
        if let CaptureState::PanningOrDragging { resume, .. } = std::mem::take(&mut self.state) {
            self.end_pan(resume);
        }
        CaptureOutcome::Unchanged
    }

    // ========================================================================
    // Prompt list management
    // ========================================================================

    /// Abandon the in-progress shape.
    pub fn cancel(&mut self) -> CaptureOutcome {
        match self.state {
            CaptureState::DrawingBoxOrCircle { .. } | CaptureState::DrawingPolygon { .. } => {
                self.state = CaptureState::Idle;
                log::debug!("Cancelled in-progress {}", self.tool.name());
                CaptureOutcome::Redraw
            }
            _ => CaptureOutcome::Unchanged,
        }
    }

    /// Remove the most recent prompt.
    pub fn undo_last(&mut self) -> Option<Prompt> {
        let prompt = self.prompts.pop()?;
        self.counts.decrement(prompt.label);
        log::debug!("Removed last {:?} prompt", prompt.shape.kind());
        Some(prompt)
    }

    /// Clear the prompt list, counts and any in-progress shape.
    pub fn clear(&mut self) -> CaptureOutcome {
        let had_any = !self.prompts.is_empty() || !self.state.is_idle();
        self.prompts.clear();
        self.counts.clear();
        self.state = CaptureState::Idle;
        if had_any {
            log::debug!("Prompts cleared");
            CaptureOutcome::PromptsRemoved
        } else {
            CaptureOutcome::Unchanged
        }
    }

    /// Clear prompts and return the view to identity.
    pub fn reset(&mut self) {
        self.clear();
        self.view = ViewTransform::identity();
    }

    /// Shape being drawn right now, for preview rendering.
    pub fn preview(&self) -> Option<PromptShape> {
        let polygon = |points: &[Point]| PromptShape::Polygon {
            points: points.to_vec(),
        };
        match &self.state {
            CaptureState::DrawingBoxOrCircle { start, current } => Some(match self.tool {
                Tool::Circle => PromptShape::Circle {
                    center: *start,
                    radius: start.distance_to(current),
                },
                _ => PromptShape::Box {
                    start: *start,
                    end: *current,
                },
            }),
            CaptureState::DrawingPolygon { points } => Some(polygon(points)),
            CaptureState::PanningOrDragging {
                resume: Some(points),
                ..
            } => Some(polygon(points)),
            _ => None,
        }
    }

    /// Prompts normalized to `[0,1]` for submission.
    pub fn export(&self, image: ImageSize) -> Vec<ExportedPrompt> {
        export_prompts(&self.prompts, image)
    }

    /// Prompts in image-pixel coordinates.
    pub fn export_raw(&self) -> Vec<ExportedPrompt> {
        export_prompts_raw(&self.prompts)
    }

    fn push_prompt(&mut self, shape: PromptShape) {
        log::debug!("Prompt added: {:?} label {:?}", shape.kind(), self.label);
        self.counts.increment(self.label);
        self.prompts.push(Prompt::new(shape, self.label));
    }

    fn commit_polygon(&mut self, points: Vec<Point>) -> bool {
        if points.len() < MIN_POLYGON_POINTS {
            log::debug!("Dropped polygon with {} point(s)", points.len());
            return false;
        }
        self.push_prompt(PromptShape::Polygon { points });
        true
    }

    fn end_pan(&mut self, resume: Option<Vec<Point>>) {
        self.state = match resume {
            Some(points) => CaptureState::DrawingPolygon { points },
            None => CaptureState::Idle,
        };
    }

    fn remove_last_vertex(&mut self) -> CaptureOutcome {
        let CaptureState::DrawingPolygon { points } = &mut self.state else {
            return CaptureOutcome::Unchanged;
        };
        points.pop();
        if points.is_empty() {
            self.state = CaptureState::Idle;
        }
        CaptureOutcome::Redraw
    }
}

impl Default for PromptCapture {
    fn default() -> Self {
        let mut input = InputController::default();
        input.attach();
        Self::new(input, ZoomLimits::default(), KeyBindings::default())
    }
}
