// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stateless connection rendering: (connection, style) in, ordered draw
//! commands out. The rendering surface executes the commands; the core
//! never touches a painter directly.

use crate::geometry::{ConnectionGeometry, SAMPLE_SEGMENTS};
use crate::port::DataType;
use crate::style::{darker, ConnectionStyle, LayoutDirection, SplineType};
use egui::{Color32, Pos2, Rect};

/// One step of a stroked path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Start a subpath
    MoveTo(Pos2),
    /// Straight segment to a point
    LineTo(Pos2),
    /// Cubic bezier segment
    CubicTo {
        /// First control point
        c1: Pos2,
        /// Second control point
        c2: Pos2,
        /// Segment end
        to: Pos2,
    },
}

/// Stroke parameters for a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    /// Line width
    pub width: f32,
    /// Line color
    pub color: Color32,
    /// Dash pattern as (dash length, gap length); `None` for solid
    pub dash: Option<[f32; 2]>,
}

impl StrokeStyle {
    fn solid(width: f32, color: Color32) -> Self {
        Self {
            width,
            color,
            dash: None,
        }
    }
}

/// A declarative draw instruction for the rendering surface
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Stroke a path
    Stroke {
        /// Path to stroke
        path: Vec<PathSegment>,
        /// Stroke parameters
        stroke: StrokeStyle,
    },
    /// Stroke a rectangle outline
    StrokeRect {
        /// Rectangle in scene coordinates
        rect: Rect,
        /// Stroke parameters
        stroke: StrokeStyle,
    },
    /// Fill a circle
    FilledEllipse {
        /// Center in scene coordinates
        center: Pos2,
        /// Radius
        radius: f32,
        /// Fill color
        color: Color32,
    },
}

/// Per-call render options.
///
/// `debug_draw` replaces the source's process-wide debug flag: it is plain
/// per-renderer configuration, off by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaintOptions {
    /// Whether the connection is selected
    pub selected: bool,
    /// Overlay control points and the bounding box
    pub debug_draw: bool,
}

/// Everything the painter needs to know about one connection
#[derive(Debug, Clone, Copy)]
pub struct ConnectionView<'a> {
    /// Endpoints, hover flag and spline type
    pub geometry: &'a ConnectionGeometry,
    /// One endpoint is still unattached (drag in progress)
    pub mid_drag: bool,
    /// Data type at the output end, if attached
    pub output_type: Option<&'a DataType>,
    /// Data type at the input end, if attached
    pub input_type: Option<&'a DataType>,
}

/// Stateless connection render composition
pub struct ConnectionPainter;

impl ConnectionPainter {
    /// Compose the draw commands for one connection, strictly ordered:
    /// halo, sketch line, normal line, debug overlay, endpoint dots.
    pub fn paint(
        view: ConnectionView<'_>,
        style: &ConnectionStyle,
        layout: LayoutDirection,
        options: PaintOptions,
    ) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        let geom = view.geometry;

        // 1. Fat background behind hovered or selected connections.
        if geom.hovered() || options.selected {
            let color = if options.selected {
                style.selected_halo_color
            } else {
                style.hovered_color
            };
            commands.push(DrawCommand::Stroke {
                path: curve_path(geom, layout),
                stroke: StrokeStyle::solid(2.0 * style.line_width, color),
            });
        }

        // 2. Dashed sketch line while one end still follows the pointer.
        if view.mid_drag {
            commands.push(DrawCommand::Stroke {
                path: curve_path(geom, layout),
                stroke: StrokeStyle {
                    width: style.construction_line_width,
                    color: style.construction_color,
                    dash: Some([6.0, 4.0]),
                },
            });
        } else {
            // 3. Normal line, split into two color halves when the endpoint
            // data types differ (visualizing a type conversion).
            Self::paint_normal_line(&mut commands, view, style, layout, options.selected);
        }

        // 4. Optional debug overlay.
        if options.debug_draw {
            Self::paint_debug(&mut commands, geom, layout);
        }

        // 5. Endpoint dots, always last and on top.
        let radius = style.point_diameter / 2.0;
        for point in [geom.source(), geom.sink()] {
            commands.push(DrawCommand::FilledEllipse {
                center: point,
                radius,
                color: style.construction_color,
            });
        }

        commands
    }

    fn paint_normal_line(
        commands: &mut Vec<DrawCommand>,
        view: ConnectionView<'_>,
        style: &ConnectionStyle,
        layout: LayoutDirection,
        selected: bool,
    ) {
        let geom = view.geometry;

        let gradient = style.use_data_defined_colors
            && matches!(
                (view.output_type, view.input_type),
                (Some(out), Some(inp)) if out.id != inp.id
            );

        let base_out = match view.output_type {
            Some(data_type) => style.normal_color_for(&data_type.id),
            None => style.normal_color,
        };

        if gradient {
            let base_in = view
                .input_type
                .map(|t| style.normal_color_for(&t.id))
                .unwrap_or(style.normal_color);
            let shade = |c: Color32| if selected { darker(c, 200) } else { c };

            let points = geom.sample(layout, SAMPLE_SEGMENTS);
            let mid = points.len() / 2;
            commands.push(DrawCommand::Stroke {
                path: polyline_path(&points[..=mid]),
                stroke: StrokeStyle::solid(style.line_width, shade(base_out)),
            });
            commands.push(DrawCommand::Stroke {
                path: polyline_path(&points[mid..]),
                stroke: StrokeStyle::solid(style.line_width, shade(base_in)),
            });
        } else {
            let color = if selected {
                if style.use_data_defined_colors {
                    darker(base_out, 200)
                } else {
                    style.selected_color
                }
            } else {
                base_out
            };
            commands.push(DrawCommand::Stroke {
                path: curve_path(geom, layout),
                stroke: StrokeStyle::solid(style.line_width, color),
            });
        }
    }

    fn paint_debug(
        commands: &mut Vec<DrawCommand>,
        geom: &ConnectionGeometry,
        layout: LayoutDirection,
    ) {
        let (c1, c2) = geom.points_c1_c2(layout);
        commands.push(DrawCommand::Stroke {
            path: vec![
                PathSegment::MoveTo(geom.source()),
                PathSegment::LineTo(c1),
                PathSegment::LineTo(c2),
                PathSegment::LineTo(geom.sink()),
            ],
            stroke: StrokeStyle::solid(1.0, Color32::RED),
        });
        for point in [c1, c2] {
            commands.push(DrawCommand::FilledEllipse {
                center: point,
                radius: 3.0,
                color: Color32::RED,
            });
        }
        commands.push(DrawCommand::StrokeRect {
            rect: geom.bounding_rect(layout),
            stroke: StrokeStyle::solid(1.0, Color32::YELLOW),
        });
    }
}

/// The connection's curve as a path
fn curve_path(geom: &ConnectionGeometry, layout: LayoutDirection) -> Vec<PathSegment> {
    match geom.spline_type() {
        SplineType::Linear => vec![
            PathSegment::MoveTo(geom.source()),
            PathSegment::LineTo(geom.sink()),
        ],
        SplineType::Cubic => {
            let (c1, c2) = geom.points_c1_c2(layout);
            vec![
                PathSegment::MoveTo(geom.source()),
                PathSegment::CubicTo {
                    c1,
                    c2,
                    to: geom.sink(),
                },
            ]
        }
    }
}

fn polyline_path(points: &[Pos2]) -> Vec<PathSegment> {
    let mut path = Vec::with_capacity(points.len());
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.push(PathSegment::MoveTo(*first));
    }
    path.extend(iter.map(|p| PathSegment::LineTo(*p)));
    path
}
