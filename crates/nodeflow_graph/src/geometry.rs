// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection curve geometry: control points, bounds and hover testing.

use crate::port::PortKind;
use crate::style::{LayoutDirection, SplineType};
use egui::{Pos2, Rect, Vec2};

/// Largest control-point offset from an endpoint
const MAX_CONTROL_OFFSET: f32 = 200.0;

/// Parametric steps used for hover testing and gradient rendering
pub(crate) const SAMPLE_SEGMENTS: usize = 20;

/// Pick tolerance: the path is treated as thickened by this many units
const HIT_TOLERANCE: f32 = 10.0;

/// Scale + translation affine applied when mapping node-local coordinates
/// into the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTransform {
    /// Uniform scale factor
    pub scale: f32,
    /// Translation applied after scaling
    pub translation: Vec2,
}

impl SceneTransform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translation: Vec2::ZERO,
    };

    /// Create a transform from scale and translation
    pub fn new(scale: f32, translation: Vec2) -> Self {
        Self { scale, translation }
    }

    /// Map a point through this transform
    pub fn apply(&self, point: Pos2) -> Pos2 {
        Pos2::new(
            point.x * self.scale + self.translation.x,
            point.y * self.scale + self.translation.y,
        )
    }
}

impl Default for SceneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scene-space endpoints and derived curve data for one connection.
///
/// `source` is the output-side endpoint, `sink` the input side. Either may
/// be a free point while the connection is being dragged.
#[derive(Debug, Clone)]
pub struct ConnectionGeometry {
    source: Pos2,
    sink: Pos2,
    hovered: bool,
    spline_type: SplineType,
}

impl ConnectionGeometry {
    /// Create a geometry with both endpoints at the origin
    pub fn new(spline_type: SplineType) -> Self {
        Self {
            source: Pos2::ZERO,
            sink: Pos2::ZERO,
            hovered: false,
            spline_type,
        }
    }

    /// Output-side endpoint
    pub fn source(&self) -> Pos2 {
        self.source
    }

    /// Input-side endpoint
    pub fn sink(&self) -> Pos2 {
        self.sink
    }

    /// Endpoint for one side: `Output` maps to source, `Input` to sink
    pub fn endpoint(&self, kind: PortKind) -> Pos2 {
        match kind {
            PortKind::Output => self.source,
            PortKind::Input => self.sink,
        }
    }

    /// Move one endpoint
    pub fn set_endpoint(&mut self, kind: PortKind, position: Pos2) {
        match kind {
            PortKind::Output => self.source = position,
            PortKind::Input => self.sink = position,
        }
    }

    /// Whether the pointer is currently over the curve
    pub fn hovered(&self) -> bool {
        self.hovered
    }

    /// Set the hover flag
    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Curve family in use
    pub fn spline_type(&self) -> SplineType {
        self.spline_type
    }

    /// Change the curve family
    pub fn set_spline_type(&mut self, spline_type: SplineType) {
        self.spline_type = spline_type;
    }

    /// Cubic control points.
    ///
    /// Each offsets from its endpoint along the dominant axis of the layout
    /// direction, by half the straight-line endpoint distance clamped to a
    /// maximum, so the curve exits and enters ports perpendicular to the
    /// node edge.
    pub fn points_c1_c2(&self, layout: LayoutDirection) -> (Pos2, Pos2) {
        let distance = self.source.distance(self.sink);
        let offset = (distance * 0.5).min(MAX_CONTROL_OFFSET);
        let axis = match layout {
            LayoutDirection::Horizontal => Vec2::new(offset, 0.0),
            LayoutDirection::Vertical => Vec2::new(0.0, offset),
        };
        (self.source + axis, self.sink - axis)
    }

    /// Minimal rectangle enclosing the endpoints and, for cubic splines,
    /// both control points. Used for culling and hit-test pre-filtering.
    pub fn bounding_rect(&self, layout: LayoutDirection) -> Rect {
        let mut rect = Rect::from_two_pos(self.source, self.sink);
        if self.spline_type == SplineType::Cubic {
            let (c1, c2) = self.points_c1_c2(layout);
            rect = rect.union(Rect::from_two_pos(c1, c2));
        }
        rect
    }

    /// Polyline approximation of the curve with `segments` steps.
    ///
    /// Linear splines return just the two endpoints.
    pub fn sample(&self, layout: LayoutDirection, segments: usize) -> Vec<Pos2> {
        match self.spline_type {
            SplineType::Linear => vec![self.source, self.sink],
            SplineType::Cubic => {
                let (c1, c2) = self.points_c1_c2(layout);
                bezier_points(self.source, c1, c2, self.sink, segments)
            }
        }
    }

    /// Whether `point` lies on the stroked path.
    ///
    /// The curve is sampled at a fixed number of parametric steps and the
    /// resulting polyline thickened by the pick tolerance. An intentional
    /// approximation favoring speed over analytic distance.
    pub fn hit_test(&self, point: Pos2, layout: LayoutDirection) -> bool {
        if !self
            .bounding_rect(layout)
            .expand(HIT_TOLERANCE)
            .contains(point)
        {
            return false;
        }
        let polyline = self.sample(layout, SAMPLE_SEGMENTS);
        polyline
            .windows(2)
            .any(|pair| distance_to_segment(point, pair[0], pair[1]) <= HIT_TOLERANCE)
    }
}

/// Generate points along a cubic bezier curve
pub(crate) fn bezier_points(
    p0: Pos2,
    p1: Pos2,
    p2: Pos2,
    p3: Pos2,
    segments: usize,
) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * p0.x + 3.0 * mt2 * t * p1.x + 3.0 * mt * t2 * p2.x + t3 * p3.x;
        let y = mt3 * p0.y + 3.0 * mt2 * t * p1.y + 3.0 * mt * t2 * p2.y + t3 * p3.y;

        points.push(Pos2::new(x, y));
    }
    points
}

/// Distance from `point` to the segment `a`-`b`
fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq == 0.0 {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(source: Pos2, sink: Pos2) -> ConnectionGeometry {
        let mut geom = ConnectionGeometry::new(SplineType::Cubic);
        geom.set_endpoint(PortKind::Output, source);
        geom.set_endpoint(PortKind::Input, sink);
        geom
    }

    #[test]
    fn test_control_points_offset_along_layout_axis() {
        let geom = geometry(Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0));
        let (c1, c2) = geom.points_c1_c2(LayoutDirection::Horizontal);
        assert_eq!(c1, Pos2::new(50.0, 0.0));
        assert_eq!(c2, Pos2::new(50.0, 0.0));

        let (c1, c2) = geom.points_c1_c2(LayoutDirection::Vertical);
        assert_eq!(c1, Pos2::new(0.0, 50.0));
        assert_eq!(c2, Pos2::new(100.0, -50.0));
    }

    #[test]
    fn test_control_point_offset_is_clamped() {
        let geom = geometry(Pos2::new(0.0, 0.0), Pos2::new(1000.0, 0.0));
        let (c1, _) = geom.points_c1_c2(LayoutDirection::Horizontal);
        assert_eq!(c1.x, MAX_CONTROL_OFFSET);
    }

    #[test]
    fn test_bounding_rect_includes_control_points() {
        let geom = geometry(Pos2::new(100.0, 0.0), Pos2::new(0.0, 0.0));
        // Back-edge: control points stick out past both endpoints.
        let rect = geom.bounding_rect(LayoutDirection::Horizontal);
        assert!(rect.min.x < 0.0);
        assert!(rect.max.x > 100.0);
    }

    #[test]
    fn test_hit_on_curve_midpoint() {
        let geom = geometry(Pos2::new(0.0, 0.0), Pos2::new(200.0, 100.0));
        let midpoint = geom.sample(LayoutDirection::Horizontal, SAMPLE_SEGMENTS)
            [SAMPLE_SEGMENTS / 2];
        assert!(geom.hit_test(midpoint, LayoutDirection::Horizontal));
    }

    #[test]
    fn test_miss_far_from_curve() {
        let geom = geometry(Pos2::new(0.0, 0.0), Pos2::new(200.0, 0.0));
        assert!(!geom.hit_test(Pos2::new(100.0, 500.0), LayoutDirection::Horizontal));
    }

    #[test]
    fn test_linear_hit_test() {
        let mut geom = geometry(Pos2::new(0.0, 0.0), Pos2::new(100.0, 100.0));
        geom.set_spline_type(SplineType::Linear);
        assert!(geom.hit_test(Pos2::new(50.0, 50.0), LayoutDirection::Horizontal));
        assert!(!geom.hit_test(Pos2::new(100.0, 0.0), LayoutDirection::Horizontal));
    }

    #[test]
    fn test_transform_maps_scale_then_translation() {
        let t = SceneTransform::new(2.0, Vec2::new(10.0, -5.0));
        assert_eq!(t.apply(Pos2::new(3.0, 4.0)), Pos2::new(16.0, 3.0));
        assert_eq!(
            SceneTransform::IDENTITY.apply(Pos2::new(3.0, 4.0)),
            Pos2::new(3.0, 4.0)
        );
    }
}
