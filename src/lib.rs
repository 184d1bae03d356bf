//! maskcanvas - interactive annotation canvas core
//!
//! Prompt capture, contour rendering and zoom/selection synchronization for
//! prompt-driven segmentation review. Segmentation, persistence and
//! quantification are external collaborators reached through the traits in
//! [`services`].

pub mod capture;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod contour;
pub mod error;
pub mod geometry;
pub mod input;
pub mod keybindings;
pub mod pending;
pub mod prompt;
pub mod render;
pub mod script;
pub mod services;
pub mod session;
pub mod store;
pub mod sync;
pub mod transform;


pub use capture::{CaptureOutcome, CaptureState, PointerButton, PromptCapture};
pub use config::{CanvasConfig, ConfigError, LogLevel};
pub use contour::{CandidateMask, Contour, ContourRecord, Mask, MaskRecord, ReviewStatus};
pub use error::{ServiceError, SessionError};
pub use geometry::{BoundingBox, ImageSize, Point};
pub use input::{InputController, Key};
pub use prompt::{ExportedPrompt, Label, Prompt, PromptShape, Tool, export_prompts};
pub use render::{DrawCommand, Scene, render};
pub use services::{ImageInfo, MaskPersistence, SegmentationService};
pub use session::Session;
pub use store::FinalMaskStore;
pub use sync::{CanvasKind, SelectionRef, ZoomSelectionSync};
pub use transform::{ViewTransform, ZoomState};
