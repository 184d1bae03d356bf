//! Prompt types and the normalized export format.
//!
//! Prompts are captured in image-pixel space. [`export_prompts`] converts them
//! to the `[{type, label, coordinates}]` payload the segmentation service
//! consumes, normalizing by the image size and rounding to four decimals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{EXPORT_DECIMALS, MIN_CLOSED_POINTS};
use crate::geometry::{ImageSize, Point, round_to};

/// Prompt label. `0` is background, `1` is foreground; larger values are
/// class indices used by the point-only variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub u32);

impl Label {
    pub const BACKGROUND: Label = Label(0);
    pub const FOREGROUND: Label = Label(1);
}

impl Default for Label {
    fn default() -> Self {
        Label::FOREGROUND
    }
}

/// Prompt tools available on the drawing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Drag to pan the image
    Pan,
    #[default]
    Point,
    Box,
    Circle,
    Polygon,
}

impl Tool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pan => "Pan",
            Tool::Point => "Point",
            Tool::Box => "Box",
            Tool::Circle => "Circle",
            Tool::Polygon => "Polygon",
        }
    }

    /// Get all available tools.
    pub fn all() -> &'static [Tool] {
        &[Tool::Pan, Tool::Point, Tool::Box, Tool::Circle, Tool::Polygon]
    }
}

/// Prompt geometry in image-pixel space.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptShape {
    Point(Point),
    /// Corners kept in drag order, not normalized to min/max.
    Box { start: Point, end: Point },
    Circle { center: Point, radius: f32 },
    Polygon { points: Vec<Point> },
}

impl PromptShape {
    pub fn kind(&self) -> PromptKind {
        match self {
            PromptShape::Point(_) => PromptKind::Point,
            PromptShape::Box { .. } => PromptKind::Box,
            PromptShape::Circle { .. } => PromptKind::Circle,
            PromptShape::Polygon { .. } => PromptKind::Polygon,
        }
    }

    /// Whether the shape is drawn as a closed outline.
    ///
    /// Two-point polygons stay open.
    pub fn is_closed(&self) -> bool {
        match self {
            PromptShape::Point(_) => false,
            PromptShape::Box { .. } | PromptShape::Circle { .. } => true,
            PromptShape::Polygon { points } => points.len() >= MIN_CLOSED_POINTS,
        }
    }
}

/// A finished prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub shape: PromptShape,
    pub label: Label,
}

impl Prompt {
    pub fn new(shape: PromptShape, label: Label) -> Self {
        Self { shape, label }
    }

    /// Coordinates in the export layout, without normalization.
    pub fn raw_coordinates(&self) -> PromptCoordinates {
        coordinates_for(&self.shape, |p| p, |r| r)
    }

    /// Coordinates normalized to `[0,1]` and rounded for export.
    pub fn normalized_coordinates(&self, image: ImageSize) -> PromptCoordinates {
        let norm = |v: f32| round_to(v.clamp(0.0, 1.0), EXPORT_DECIMALS);
        coordinates_for(
            &self.shape,
            |p| {
                let f = image.to_fraction(p);
                Point::new(norm(f.x), norm(f.y))
            },
            |r| norm(r / image.max_side()),
        )
    }
}

fn coordinates_for(
    shape: &PromptShape,
    point: impl Fn(Point) -> Point,
    radius: impl Fn(f32) -> f32,
) -> PromptCoordinates {
    match shape {
        PromptShape::Point(p) => {
            let p = point(*p);
            PromptCoordinates::Point { x: p.x, y: p.y }
        }
        PromptShape::Box { start, end } => {
            let (s, e) = (point(*start), point(*end));
            PromptCoordinates::Box {
                start_x: s.x,
                start_y: s.y,
                end_x: e.x,
                end_y: e.y,
            }
        }
        PromptShape::Circle { center, radius: r } => {
            let c = point(*center);
            PromptCoordinates::Circle {
                center_x: c.x,
                center_y: c.y,
                radius: radius(*r),
            }
        }
        PromptShape::Polygon { points } => PromptCoordinates::Polygon {
            points: points
                .iter()
                .map(|p| {
                    let p = point(*p);
                    XY { x: p.x, y: p.y }
                })
                .collect(),
        },
    }
}

/// Prompt type tag in the export payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Point,
    Box,
    Circle,
    Polygon,
}

/// A `{x, y}` pair in the export payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XY {
    pub x: f32,
    pub y: f32,
}

/// Tool-specific coordinate object in the export payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptCoordinates {
    #[serde(rename_all = "camelCase")]
    Box {
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
    },
    #[serde(rename_all = "camelCase")]
    Circle {
        center_x: f32,
        center_y: f32,
        radius: f32,
    },
    Polygon { points: Vec<XY> },
    Point { x: f32, y: f32 },
}

/// One entry of the exported prompt list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedPrompt {
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub label: Label,
    pub coordinates: PromptCoordinates,
}

/// Export prompts normalized to the given image size.
pub fn export_prompts(prompts: &[Prompt], image: ImageSize) -> Vec<ExportedPrompt> {
    prompts
        .iter()
        .map(|p| ExportedPrompt {
            kind: p.shape.kind(),
            label: p.label,
            coordinates: p.normalized_coordinates(image),
        })
        .collect()
}

/// Export prompts in image-pixel coordinates.
pub fn export_prompts_raw(prompts: &[Prompt]) -> Vec<ExportedPrompt> {
    prompts
        .iter()
        .map(|p| ExportedPrompt {
            kind: p.shape.kind(),
            label: p.label,
            coordinates: p.raw_coordinates(),
        })
        .collect()
}

/// Running per-label prompt counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCounts {
    counts: BTreeMap<Label, usize>,
}

impl LabelCounts {
    pub fn increment(&mut self, label: Label) {
        *self.counts.entry(label).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, label: Label) {
        if let Some(count) = self.counts.get_mut(&label) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(&label);
            }
        }
    }

    pub fn get(&self, label: Label) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    pub fn foreground(&self) -> usize {
        self.get(Label::FOREGROUND)
    }

    pub fn background(&self) -> usize {
        self.get(Label::BACKGROUND)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size() -> ImageSize {
        ImageSize::new(200, 100)
    }

    #[test]
    fn test_point_export_normalizes() {
        let prompt = Prompt::new(PromptShape::Point(Point::new(50.0, 25.0)), Label::FOREGROUND);
        let exported = export_prompts(&[prompt], size());
        assert_eq!(exported[0].kind, PromptKind::Point);
        assert_eq!(
            exported[0].coordinates,
            PromptCoordinates::Point { x: 0.25, y: 0.25 }
        );
    }

    #[test]
    fn test_circle_radius_uses_longer_side() {
        let prompt = Prompt::new(
            PromptShape::Circle {
                center: Point::new(100.0, 50.0),
                radius: 20.0,
            },
            Label::BACKGROUND,
        );
        match prompt.normalized_coordinates(size()) {
            PromptCoordinates::Circle {
                center_x,
                center_y,
                radius,
            } => {
                assert_eq!(center_x, 0.5);
                assert_eq!(center_y, 0.5);
                assert_eq!(radius, 0.1);
            }
            other => panic!("expected circle, got {:?}", other),
        }
    }

    #[test]
    fn test_export_rounds_to_four_decimals() {
        let prompt = Prompt::new(PromptShape::Point(Point::new(1.0, 1.0)), Label::FOREGROUND);
        let exported = export_prompts(&[prompt], ImageSize::new(3, 7));
        assert_eq!(
            exported[0].coordinates,
            PromptCoordinates::Point {
                x: 0.3333,
                y: 0.1429
            }
        );
    }

    #[test]
    fn test_export_clamps_outside_points() {
        let prompt = Prompt::new(PromptShape::Point(Point::new(-5.0, 150.0)), Label::FOREGROUND);
        let exported = export_prompts(&[prompt], size());
        assert_eq!(
            exported[0].coordinates,
            PromptCoordinates::Point { x: 0.0, y: 1.0 }
        );
    }

    #[test]
    fn test_export_json_layout() {
        let prompts = vec![
            Prompt::new(
                PromptShape::Box {
                    start: Point::new(10.0, 10.0),
                    end: Point::new(110.0, 60.0),
                },
                Label::FOREGROUND,
            ),
            Prompt::new(
                PromptShape::Polygon {
                    points: vec![Point::new(0.0, 0.0), Point::new(200.0, 100.0)],
                },
                Label::BACKGROUND,
            ),
        ];
        // Go through text so f32 values print in their shortest form
        let text = serde_json::to_string(&export_prompts(&prompts, size())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json[0]["type"], "box");
        assert_eq!(json[0]["label"], 1);
        assert_eq!(json[0]["coordinates"]["startX"], 0.05);
        assert_eq!(json[0]["coordinates"]["endY"], 0.6);
        assert_eq!(json[1]["type"], "polygon");
        assert_eq!(json[1]["coordinates"]["points"][1]["x"], 1.0);
    }

    #[test]
    fn test_two_point_polygon_is_open() {
        let open = PromptShape::Polygon {
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)],
        };
        let closed = PromptShape::Polygon {
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(0.0, 1.0)],
        };
        assert!(!open.is_closed());
        assert!(closed.is_closed());
    }

    #[test]
    fn test_label_counts() {
        let mut counts = LabelCounts::default();
        counts.increment(Label::FOREGROUND);
        counts.increment(Label::FOREGROUND);
        counts.increment(Label::BACKGROUND);
        counts.increment(Label(4));
        assert_eq!(counts.foreground(), 2);
        assert_eq!(counts.background(), 1);
        assert_eq!(counts.get(Label(4)), 1);
        assert_eq!(counts.total(), 4);

        counts.decrement(Label::FOREGROUND);
        counts.decrement(Label::BACKGROUND);
        counts.decrement(Label::BACKGROUND);
        assert_eq!(counts.foreground(), 1);
        assert_eq!(counts.background(), 0);
    }
}
