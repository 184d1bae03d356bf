//! Contour rendering as a pure function.
//!
//! [`render`] turns a [`Scene`] into a flat list of [`DrawCommand`]s for a
//! 2D canvas backend. Nothing here touches a real surface, so frames can be
//! compared and snapshotted in tests.
//!
//! Frame order: clear, save, `translate(pan)` + `scale(zoom)`, base image,
//! overlay, contours with badges, prompts, restore.

mod style;

pub use style::{
    ContourStyle, Glow, LabelPalette, LabelStyleProvider, RenderSettings, contour_style,
    prompt_color,
};

use serde::Serialize;

use crate::color_utils::Color;
use crate::constants::render as consts;
use crate::contour::Contour;
use crate::geometry::{ImageSize, Point, centroid};
use crate::prompt::{Prompt, PromptShape};
use crate::transform::ViewTransform;

/// Compositing mode for subsequent fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeOp {
    SourceOver,
    /// Erases destination pixels where the source is drawn.
    DestinationOut,
}

/// A single drawing instruction. Coordinates after `Transform` are in
/// image-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        width: u32,
        height: u32,
    },
    Save,
    Restore,
    /// `translate(x, y)` followed by `scale(scale)`.
    Transform {
        translate: Point,
        scale: f32,
    },
    /// Draw the base image at native resolution at the origin.
    DrawImage {
        width: u32,
        height: u32,
    },
    /// Start an offscreen layer composited onto the canvas at `EndLayer`.
    BeginLayer,
    EndLayer,
    SetComposite {
        mode: CompositeOp,
    },
    FillRect {
        origin: Point,
        width: f32,
        height: f32,
        color: Color,
    },
    FillPath {
        points: Vec<Point>,
        color: Color,
    },
    StrokePath {
        points: Vec<Point>,
        closed: bool,
        width: f32,
        color: Color,
        glow: Option<Glow>,
    },
    FillCircle {
        center: Point,
        radius: f32,
        color: Color,
    },
    StrokeCircle {
        center: Point,
        radius: f32,
        width: f32,
        color: Color,
    },
    FillRoundedRect {
        origin: Point,
        width: f32,
        height: f32,
        radius: f32,
        color: Color,
    },
    StrokeRect {
        origin: Point,
        width: f32,
        height: f32,
        line_width: f32,
        color: Color,
    },
    /// Text centered on `center`.
    FillText {
        text: String,
        center: Point,
        size: f32,
        color: Color,
    },
}

/// A contour placed in a scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneContour<'a> {
    pub contour: &'a Contour,
    /// One-based number shown in the badge.
    pub number: usize,
    pub selected: bool,
}

/// Everything needed to draw one frame of a canvas.
pub struct Scene<'a> {
    /// Canvas size in screen pixels.
    pub viewport: ImageSize,
    /// Base image size, `None` until the image is decoded.
    pub image: Option<ImageSize>,
    pub view: ViewTransform,
    pub contours: Vec<SceneContour<'a>>,
    /// Contour (index into `contours`) to spotlight.
    pub spotlight: Option<usize>,
    pub prompts: &'a [Prompt],
    pub preview: Option<PromptShape>,
    pub labels: &'a dyn LabelStyleProvider,
    pub settings: RenderSettings,
}

impl<'a> Scene<'a> {
    pub fn new(viewport: ImageSize, labels: &'a dyn LabelStyleProvider) -> Self {
        Self {
            viewport,
            image: None,
            view: ViewTransform::identity(),
            contours: Vec::new(),
            spotlight: None,
            prompts: &[],
            preview: None,
            labels,
            settings: RenderSettings::default(),
        }
    }
}

/// Render a scene. Returns no commands while the canvas or image is missing.
pub fn render(scene: &Scene<'_>) -> Vec<DrawCommand> {
    let Some(image) = scene.image else {
        return Vec::new();
    };
    if scene.viewport.is_empty() || image.is_empty() || scene.view.scale() <= 0.0 {
        return Vec::new();
    }

    let mut cmds = vec![
        DrawCommand::Clear {
            width: scene.viewport.width,
            height: scene.viewport.height,
        },
        DrawCommand::Save,
        DrawCommand::Transform {
            translate: scene.view.pan,
            scale: scene.view.scale(),
        },
        DrawCommand::DrawImage {
            width: image.width,
            height: image.height,
        },
    ];

    draw_overlay(scene, &mut cmds);

    for item in &scene.contours {
        draw_contour(scene, item, &mut cmds);
    }

    for prompt in scene.prompts {
        draw_prompt(&prompt.shape, prompt_color(prompt.label), scene.view.scale(), &mut cmds);
    }
    if let Some(preview) = &scene.preview {
        draw_prompt(preview, Color::WHITE.with_alpha(0.8), scene.view.scale(), &mut cmds);
    }

    cmds.push(DrawCommand::Restore);
    cmds
}

/// Spotlight around the selected contour, or a light wash otherwise.
fn draw_overlay(scene: &Scene<'_>, cmds: &mut Vec<DrawCommand>) {
    // The whole canvas, expressed in image space.
    let top_left = scene.view.to_image(Point::new(0.0, 0.0));
    let bottom_right = scene
        .view
        .to_image(Point::new(scene.viewport.width_f(), scene.viewport.height_f()));
    let cover = |alpha: f32| DrawCommand::FillRect {
        origin: top_left,
        width: bottom_right.x - top_left.x,
        height: bottom_right.y - top_left.y,
        color: Color::BLACK.with_alpha(alpha),
    };

    let spotlit = scene
        .spotlight
        .and_then(|i| scene.contours.get(i))
        .filter(|item| item.contour.is_closed());

    match spotlit {
        Some(item) => {
            cmds.push(DrawCommand::BeginLayer);
            cmds.push(cover(scene.settings.spotlight_alpha));
            cmds.push(DrawCommand::SetComposite {
                mode: CompositeOp::DestinationOut,
            });
            cmds.push(DrawCommand::FillPath {
                points: item.contour.points.clone(),
                color: Color::BLACK,
            });
            cmds.push(DrawCommand::SetComposite {
                mode: CompositeOp::SourceOver,
            });
            cmds.push(DrawCommand::EndLayer);
        }
        None => cmds.push(cover(scene.settings.dim_alpha)),
    }
}

fn draw_contour(scene: &Scene<'_>, item: &SceneContour<'_>, cmds: &mut Vec<DrawCommand>) {
    let contour = item.contour;
    let scale = scene.view.scale();
    let style = contour_style(
        item.selected,
        contour.label,
        &contour.label_name,
        scene.labels,
        &scene.settings,
    );

    if !contour.is_closed() {
        if scene.settings.show_open_paths && contour.points.len() >= 2 {
            cmds.push(DrawCommand::StrokePath {
                points: contour.points.clone(),
                closed: false,
                width: style.line_width / scale,
                color: style.stroke,
                glow: style.glow,
            });
        }
        return;
    }

    cmds.push(DrawCommand::FillPath {
        points: contour.points.clone(),
        color: style.fill,
    });
    cmds.push(DrawCommand::StrokePath {
        points: contour.points.clone(),
        closed: true,
        width: style.line_width / scale,
        color: style.stroke,
        glow: style.glow,
    });

    if scene.view.zoom < scene.settings.badge_zoom_threshold {
        draw_badge(item, style.stroke, scale, cmds);
    }
}

/// `#n` badge at the contour centroid. Sizes are divided by the scale so the
/// badge keeps a constant on-screen size.
fn draw_badge(item: &SceneContour<'_>, accent: Color, scale: f32, cmds: &mut Vec<DrawCommand>) {
    let Some(center) = centroid(&item.contour.points) else {
        return;
    };
    let text = format!("#{}", item.number);
    let size = consts::BADGE_FONT_SIZE / scale;
    let pad = consts::BADGE_PADDING / scale;
    let width = text.chars().count() as f32 * size * consts::GLYPH_ADVANCE + 2.0 * pad;
    let height = size + 2.0 * pad;
    let origin = Point::new(center.x - width / 2.0, center.y - height / 2.0);

    cmds.push(DrawCommand::FillRoundedRect {
        origin,
        width,
        height,
        radius: consts::BADGE_RADIUS / scale,
        color: Color::BLACK.with_alpha(0.7),
    });
    cmds.push(DrawCommand::FillText {
        text,
        center,
        size,
        color: Color::WHITE,
    });
    if item.selected {
        cmds.push(DrawCommand::StrokeRect {
            origin,
            width,
            height,
            line_width: 1.5 / scale,
            color: accent,
        });
    }
}

fn draw_prompt(shape: &PromptShape, color: Color, scale: f32, cmds: &mut Vec<DrawCommand>) {
    let line = 2.0 / scale;
    match shape {
        PromptShape::Point(p) => cmds.push(DrawCommand::FillCircle {
            center: *p,
            radius: consts::PROMPT_POINT_RADIUS / scale,
            color,
        }),
        PromptShape::Box { start, end } => cmds.push(DrawCommand::StrokePath {
            points: vec![
                *start,
                Point::new(end.x, start.y),
                *end,
                Point::new(start.x, end.y),
            ],
            closed: true,
            width: line,
            color,
            glow: None,
        }),
        PromptShape::Circle { center, radius } => cmds.push(DrawCommand::StrokeCircle {
            center: *center,
            radius: *radius,
            width: line,
            color,
        }),
        PromptShape::Polygon { points } => {
            if points.len() >= 2 {
                cmds.push(DrawCommand::StrokePath {
                    points: points.clone(),
                    closed: shape.is_closed(),
                    width: line,
                    color,
                    glow: None,
                });
            }
            for p in points {
                cmds.push(DrawCommand::FillCircle {
                    center: *p,
                    radius: 3.0 / scale,
                    color,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Label;

    fn square(name: &str, x: f32) -> Contour {
        Contour::new(
            vec![
                Point::new(x, 10.0),
                Point::new(x + 20.0, 10.0),
                Point::new(x + 20.0, 30.0),
                Point::new(x, 30.0),
            ],
            Label::FOREGROUND,
            name,
        )
    }

    fn scene<'a>(palette: &'a LabelPalette, contours: &'a [Contour]) -> Scene<'a> {
        let mut scene = Scene::new(ImageSize::new(200, 100), palette);
        scene.image = Some(ImageSize::new(200, 100));
        scene.contours = contours
            .iter()
            .enumerate()
            .map(|(i, contour)| SceneContour {
                contour,
                number: i + 1,
                selected: false,
            })
            .collect();
        scene
    }

    fn count(cmds: &[DrawCommand], pred: impl Fn(&DrawCommand) -> bool) -> usize {
        cmds.iter().filter(|c| pred(c)).count()
    }

    #[test]
    fn test_no_image_renders_nothing() {
        let palette = LabelPalette::default();
        let mut s = scene(&palette, &[]);
        s.image = None;
        assert!(render(&s).is_empty());

        s.image = Some(ImageSize::new(200, 100));
        s.viewport = ImageSize::new(0, 0);
        assert!(render(&s).is_empty());
    }

    #[test]
    fn test_frame_order() {
        let palette = LabelPalette::default();
        let contours = [square("Coral", 10.0)];
        let cmds = render(&scene(&palette, &contours));
        assert!(matches!(cmds[0], DrawCommand::Clear { width: 200, height: 100 }));
        assert_eq!(cmds[1], DrawCommand::Save);
        assert!(matches!(cmds[2], DrawCommand::Transform { scale, .. } if scale == 1.0));
        assert!(matches!(cmds[3], DrawCommand::DrawImage { .. }));
        // Uniform wash when nothing is spotlighted
        assert!(
            matches!(cmds[4], DrawCommand::FillRect { color, .. } if color.a == consts::DIM_ALPHA)
        );
        assert_eq!(cmds.last(), Some(&DrawCommand::Restore));
    }

    #[test]
    fn test_spotlight_cuts_hole_in_layer() {
        let palette = LabelPalette::default();
        let contours = [square("Coral", 10.0), square("Coral", 100.0)];
        let mut s = scene(&palette, &contours);
        s.spotlight = Some(1);
        s.contours[1].selected = true;
        let cmds = render(&s);

        let begin = cmds.iter().position(|c| *c == DrawCommand::BeginLayer).unwrap();
        assert!(matches!(cmds[begin + 1], DrawCommand::FillRect { .. }));
        assert_eq!(
            cmds[begin + 2],
            DrawCommand::SetComposite {
                mode: CompositeOp::DestinationOut,
            }
        );
        match &cmds[begin + 3] {
            DrawCommand::FillPath { points, .. } => assert_eq!(points, &contours[1].points),
            other => panic!("expected hole path, got {:?}", other),
        }
        assert_eq!(cmds[begin + 5], DrawCommand::EndLayer);
    }

    #[test]
    fn test_degenerate_spotlight_falls_back_to_wash() {
        let palette = LabelPalette::default();
        let contours = [Contour::new(
            vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)],
            Label::FOREGROUND,
            "Line",
        )];
        let mut s = scene(&palette, &contours);
        s.spotlight = Some(0);
        let cmds = render(&s);
        assert_eq!(count(&cmds, |c| *c == DrawCommand::BeginLayer), 0);
        assert_eq!(count(&cmds, |c| matches!(c, DrawCommand::FillPath { .. })), 0);
        assert_eq!(
            count(&cmds, |c| matches!(c, DrawCommand::StrokePath { closed: false, .. })),
            1
        );
    }

    #[test]
    fn test_badges_hidden_at_high_zoom() {
        let palette = LabelPalette::default();
        let contours = [square("Coral", 10.0), square("Coral", 100.0)];
        let mut s = scene(&palette, &contours);
        let texts = |cmds: &[DrawCommand]| {
            cmds.iter()
                .filter_map(|c| match c {
                    DrawCommand::FillText { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&render(&s)), vec!["#1", "#2"]);

        s.view = ViewTransform::new(5.0, Point::default());
        assert!(texts(&render(&s)).is_empty());
    }

    #[test]
    fn test_badge_centered_on_centroid() {
        let palette = LabelPalette::default();
        let contours = [square("Coral", 10.0)];
        let cmds = render(&scene(&palette, &contours));
        let center = cmds
            .iter()
            .find_map(|c| match c {
                DrawCommand::FillText { center, .. } => Some(*center),
                _ => None,
            })
            .unwrap();
        assert_eq!(center, Point::new(20.0, 20.0));
    }

    #[test]
    fn test_selected_badge_has_outline() {
        let palette = LabelPalette::default();
        let contours = [square("Coral", 10.0)];
        let mut s = scene(&palette, &contours);
        assert_eq!(count(&render(&s), |c| matches!(c, DrawCommand::StrokeRect { .. })), 0);
        s.contours[0].selected = true;
        let cmds = render(&s);
        assert_eq!(count(&cmds, |c| matches!(c, DrawCommand::StrokeRect { .. })), 1);
        assert_eq!(
            count(&cmds, |c| matches!(c, DrawCommand::StrokePath { glow: Some(_), .. })),
            1
        );
    }

    #[test]
    fn test_two_point_polygon_prompt_stays_open() {
        let palette = LabelPalette::default();
        let prompts = [
            Prompt::new(
                PromptShape::Polygon {
                    points: vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
                },
                Label::FOREGROUND,
            ),
            Prompt::new(
                PromptShape::Polygon {
                    points: vec![
                        Point::new(0.0, 0.0),
                        Point::new(10.0, 10.0),
                        Point::new(0.0, 10.0),
                    ],
                },
                Label::FOREGROUND,
            ),
        ];
        let mut s = scene(&palette, &[]);
        s.prompts = &prompts;
        let cmds = render(&s);
        let closed_flags: Vec<bool> = cmds
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokePath { closed, .. } => Some(*closed),
                _ => None,
            })
            .collect();
        assert_eq!(closed_flags, vec![false, true]);
    }

    #[test]
    fn test_line_width_compensates_zoom() {
        let palette = LabelPalette::default();
        let contours = [square("Coral", 10.0)];
        let mut s = scene(&palette, &contours);
        s.view = ViewTransform::new(2.0, Point::default());
        let width = render(&s)
            .iter()
            .find_map(|c| match c {
                DrawCommand::StrokePath { width, .. } => Some(*width),
                _ => None,
            })
            .unwrap();
        assert_eq!(width, RenderSettings::default().line_width / 2.0);
    }
}
