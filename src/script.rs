//! Replay of recorded annotation sessions.
//!
//! A script is a JSON document listing canvas events in order. Replaying it
//! drives a [`Session`] exactly as a UI would, with segmentation answers taken
//! from the script and persistence kept in memory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureOutcome, PointerButton};
use crate::config::{CanvasConfig, ConfigError};
use crate::contour::MaskRecord;
use crate::error::SessionError;
use crate::geometry::{ImageSize, Point};
use crate::input::Key;
use crate::prompt::{ExportedPrompt, Label, Tool};
use crate::render::{DrawCommand, render};
use crate::services::{
    ImageInfo, MemoryMaskStore, ScriptedSegmenter, SegmentationRequest, SegmentationResponse,
};
use crate::session::Session;
use crate::sync::{CanvasKind, SelectionRef};
use crate::transform::ZoomState;

/// Errors that stop a replay before it starts.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn primary() -> PointerButton {
    PointerButton::Primary
}

/// One recorded event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Viewport {
        drawing: ImageSize,
        final_mask: ImageSize,
    },
    Image {
        id: String,
        width: u32,
        height: u32,
    },
    Ready {
        canvas: CanvasKind,
    },
    Tool {
        tool: Tool,
    },
    Label {
        label: Label,
    },
    PointerDown {
        x: f32,
        y: f32,
        #[serde(default = "primary")]
        button: PointerButton,
    },
    PointerMove {
        x: f32,
        y: f32,
    },
    PointerUp {
        x: f32,
        y: f32,
        #[serde(default = "primary")]
        button: PointerButton,
    },
    DoubleClick,
    Wheel {
        delta_y: f32,
    },
    KeyDown {
        key: Key,
    },
    KeyUp {
        key: Key,
    },
    Blur,
    Undo,
    ClearPrompts,
    /// Submit the prompts; the service answers with `response`.
    Segment {
        response: SegmentationResponse,
    },
    Accept {
        indices: Vec<usize>,
    },
    Reject {
        index: usize,
    },
    Delete {
        index: usize,
    },
    SelectCandidate {
        index: usize,
    },
    SelectFinal {
        id: String,
    },
    Deselect,
    Zoom {
        level: f32,
        center: Point,
    },
    LoadFinal,
    RemoveFinal {
        id: String,
    },
    ClearFinal,
    Reset,
}

/// A recorded session.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Final mask already stored for the image before the session starts
    #[serde(default)]
    pub stored_mask: Option<MaskRecord>,
    pub events: Vec<ScriptEvent>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// A step that failed during replay. Replay continues after it.
#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub step: usize,
    pub message: String,
}

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    /// Prompts still pending, normalized as they would be submitted
    pub prompts: Vec<ExportedPrompt>,
    /// Requests sent to the segmentation service
    pub requests: Vec<SegmentationRequest>,
    pub candidates: usize,
    pub final_contours: Vec<String>,
    pub selection: Option<SelectionRef>,
    pub drawing_zoom: ZoomState,
    pub final_zoom: ZoomState,
    pub errors: Vec<StepError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawing_frame: Option<Vec<DrawCommand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_frame: Option<Vec<DrawCommand>>,
}

/// Replay options.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Use this image instead of the script's `image` events
    pub image: Option<ImageInfo>,
    /// Include the final frame of both canvases in the report
    pub frames: bool,
}

/// Drives a [`Session`] from script events.
pub struct Replay {
    session: Session,
    backend: MemoryMaskStore,
    options: ReplayOptions,
    requests: Vec<SegmentationRequest>,
    errors: Vec<StepError>,
}

impl Replay {
    pub fn new(config: CanvasConfig, options: ReplayOptions) -> Self {
        let mut session = Session::new(config);
        if let Some(image) = &options.image {
            session.set_image(Some(image.clone()));
        }
        Self {
            session,
            backend: MemoryMaskStore::new(),
            options,
            requests: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run every event and summarize the final state.
    pub fn run(mut self, script: Script) -> ReplayReport {
        if let Some(mask) = script.stored_mask {
            let image_id = self
                .options
                .image
                .as_ref()
                .map(|info| info.id.clone())
                .or_else(|| first_image_id(&script.events))
                .unwrap_or_default();
            self.backend.insert(image_id, mask);
        }

        for (step, event) in script.events.into_iter().enumerate() {
            if let Err(e) = self.apply(event) {
                log::warn!("Step {} failed: {}", step, e);
                self.errors.push(StepError {
                    step,
                    message: e.to_string(),
                });
            }
        }
        self.report()
    }

    fn apply(&mut self, event: ScriptEvent) -> Result<(), SessionError> {
        use pollster::block_on;

        let session = &mut self.session;
        match event {
            ScriptEvent::Viewport {
                drawing,
                final_mask,
            } => session.set_viewports(drawing, final_mask),
            ScriptEvent::Image { id, width, height } => {
                if self.options.image.is_none() {
                    session.set_image(Some(ImageInfo::new(id, width, height)));
                }
            }
            ScriptEvent::Ready { canvas } => {
                session.image_ready(canvas);
            }
            ScriptEvent::Tool { tool } => {
                session.input(|c| c.set_tool(tool));
            }
            ScriptEvent::Label { label } => {
                session.input(|c| {
                    c.set_label(label);
                    CaptureOutcome::Unchanged
                });
            }
            ScriptEvent::PointerDown { x, y, button } => {
                session.input(|c| c.pointer_down(Point::new(x, y), button));
            }
            ScriptEvent::PointerMove { x, y } => {
                session.input(|c| c.pointer_move(Point::new(x, y)));
            }
            ScriptEvent::PointerUp { x, y, button } => {
                session.input(|c| c.pointer_up(Point::new(x, y), button));
            }
            ScriptEvent::DoubleClick => {
                session.input(|c| c.double_click());
            }
            ScriptEvent::Wheel { delta_y } => {
                session.input(|c| c.wheel(delta_y));
            }
            ScriptEvent::KeyDown { key } => {
                session.input(|c| c.key_down(key));
            }
            ScriptEvent::KeyUp { key } => {
                session.input(|c| c.key_up(key));
            }
            ScriptEvent::Blur => {
                session.input(|c| c.blur());
            }
            ScriptEvent::Undo => {
                session.input(|c| match c.undo_last() {
                    Some(_) => CaptureOutcome::PromptsRemoved,
                    None => CaptureOutcome::Unchanged,
                });
            }
            ScriptEvent::ClearPrompts => {
                session.input(|c| c.clear());
            }
            ScriptEvent::Segment { response } => {
                let segmenter = ScriptedSegmenter::new(vec![Ok(response)]);
                let result = block_on(session.segment_with(&segmenter));
                self.requests.extend(segmenter.requests());
                result?;
            }
            ScriptEvent::Accept { indices } => {
                block_on(session.accept_candidates(&self.backend, &indices))?;
            }
            ScriptEvent::Reject { index } => session.reject_candidate(index)?,
            ScriptEvent::Delete { index } => {
                session.delete_candidate(index)?;
            }
            ScriptEvent::SelectCandidate { index } => {
                session.select_candidate(index)?;
            }
            ScriptEvent::SelectFinal { id } => {
                session.select_final(&id)?;
            }
            ScriptEvent::Deselect => {
                session.deselect();
            }
            ScriptEvent::Zoom { level, center } => {
                session.apply_zoom(level, center);
            }
            ScriptEvent::LoadFinal => {
                block_on(session.load_final_mask(&self.backend))?;
            }
            ScriptEvent::RemoveFinal { id } => {
                block_on(session.remove_final_contour(&self.backend, &id))?;
            }
            ScriptEvent::ClearFinal => {
                block_on(session.clear_final_mask(&self.backend))?;
            }
            ScriptEvent::Reset => session.reset(),
        }
        Ok(())
    }

    fn report(self) -> ReplayReport {
        let session = &self.session;
        let prompts = session
            .image()
            .map(|info| session.capture().export(info.size))
            .unwrap_or_else(|| session.capture().export_raw());
        let (drawing_frame, final_frame) = if self.options.frames {
            (
                Some(render(&session.drawing_scene())),
                Some(render(&session.final_scene())),
            )
        } else {
            (None, None)
        };

        ReplayReport {
            prompts,
            requests: self.requests,
            candidates: session
                .candidates()
                .map(|mask| mask.visible().count())
                .unwrap_or(0),
            final_contours: session.store().display_names(),
            selection: session.selection().cloned(),
            drawing_zoom: session.zoom(CanvasKind::Drawing),
            final_zoom: session.zoom(CanvasKind::FinalMask),
            errors: self.errors,
            drawing_frame,
            final_frame,
        }
    }
}

fn first_image_id(events: &[ScriptEvent]) -> Option<String> {
    events.iter().find_map(|event| match event {
        ScriptEvent::Image { id, .. } => Some(id.clone()),
        _ => None,
    })
}
