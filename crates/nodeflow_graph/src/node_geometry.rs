// SPDX-License-Identifier: MIT OR Apache-2.0
//! Derived node layout: size computation and port placement.

use crate::geometry::SceneTransform;
use crate::node::{NodeModel, ValidationState};
use crate::port::PortKind;
use crate::style::{LayoutDirection, Style};
use egui::{Pos2, Rect, Vec2};

/// Side of the corner resize handle
const RESIZE_RECT_SIZE: f32 = 7.0;

/// Text measurement used when sizing nodes.
///
/// Hosts back this with their real font machinery; headless callers use
/// [`FixedAdvanceMetrics`].
pub trait TextMetrics {
    /// Height of one text line
    fn line_height(&self) -> f32;

    /// Size of `text` at regular or bold weight
    fn measure(&self, text: &str, bold: bool) -> Vec2;
}

/// Fixed-advance [`TextMetrics`] for tests and headless layout
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvanceMetrics {
    /// Line height
    pub line_height: f32,
    /// Width of every character
    pub advance: f32,
}

impl Default for FixedAdvanceMetrics {
    fn default() -> Self {
        Self {
            line_height: 16.0,
            advance: 8.0,
        }
    }
}

impl TextMetrics for FixedAdvanceMetrics {
    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn measure(&self, text: &str, _bold: bool) -> Vec2 {
        Vec2::new(text.chars().count() as f32 * self.advance, self.line_height)
    }
}

/// Per-node layout cache.
///
/// Width and height are derived, never authored: a pure function of the
/// model's port counts, caption, validation message and embedded-content
/// size under the current style. Recomputed on demand by
/// [`Self::recalculate_size`]; any access after a model change must
/// recompute first.
#[derive(Debug, Clone)]
pub struct NodeGeometry {
    width: f32,
    height: f32,
    entry_width: f32,
    entry_height: f32,
    spacing: f32,
    input_port_width: f32,
    output_port_width: f32,
    caption_size: Vec2,
    validation_size: Vec2,
    dragging_position: Pos2,
    hovered: bool,
}

impl NodeGeometry {
    /// Create a geometry cache with placeholder extents
    pub fn new() -> Self {
        Self {
            width: 100.0,
            height: 150.0,
            entry_width: 0.0,
            entry_height: 20.0,
            spacing: 20.0,
            input_port_width: 70.0,
            output_port_width: 70.0,
            caption_size: Vec2::ZERO,
            validation_size: Vec2::ZERO,
            dragging_position: Pos2::new(-1000.0, -1000.0),
            hovered: false,
        }
    }

    /// Node width
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Node height
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Override the width (manual resize)
    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    /// Override the height (manual resize)
    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    /// Node size
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Height of one port entry row
    pub fn entry_height(&self) -> f32 {
        self.entry_height
    }

    /// Widest port label
    pub fn entry_width(&self) -> f32 {
        self.entry_width
    }

    /// Padding between entries
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Whether the pointer is over the node
    pub fn hovered(&self) -> bool {
        self.hovered
    }

    /// Set the hover flag
    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Last known pointer position while dragging over the node
    pub fn dragging_position(&self) -> Pos2 {
        self.dragging_position
    }

    /// Track the pointer while dragging
    pub fn set_dragging_position(&mut self, position: Pos2) {
        self.dragging_position = position;
    }

    /// Caption extents at bold weight, zero when the caption is hidden
    pub fn caption_size(&self) -> Vec2 {
        self.caption_size
    }

    /// Validation message extents at bold weight
    pub fn validation_size(&self) -> Vec2 {
        self.validation_size
    }

    /// Recompute the node's size from model and style.
    ///
    /// Horizontal layout: height grows with the larger port count, width is
    /// the sum of the two port-label columns. Vertical layout: height is a
    /// fixed two-row minimum, width spreads the larger port count. Both
    /// then grow for embedded content and caption, and reserve a band for
    /// the validation message when the model is not valid.
    pub fn recalculate_size(
        &mut self,
        model: &dyn NodeModel,
        style: &Style,
        metrics: &dyn TextMetrics,
    ) {
        self.spacing = style.node.spacing;
        self.entry_height = metrics.line_height();
        self.input_port_width = self.port_width(model, PortKind::Input, metrics);
        self.output_port_width = self.port_width(model, PortKind::Output, metrics);
        self.entry_width = self.input_port_width.max(self.output_port_width);

        self.caption_size = if model.caption_visible() {
            metrics.measure(&model.caption(), true)
        } else {
            Vec2::ZERO
        };
        self.validation_size = metrics.measure(&model.validation_message(), true);

        let num_inputs = model.num_ports(PortKind::Input);
        let num_outputs = model.num_ports(PortKind::Output);
        let max_entries = num_inputs.max(num_outputs) as f32;
        let port_height = self.entry_height + self.spacing;

        let (mut width, mut height) = match style.layout_direction {
            LayoutDirection::Horizontal => (
                self.input_port_width + self.output_port_width + 2.0 * self.spacing,
                port_height * max_entries,
            ),
            LayoutDirection::Vertical => (
                self.entry_width * max_entries + 2.0 * self.spacing,
                port_height * 2.0,
            ),
        };

        let content = model.embedded_content_size();
        if let Some(content) = content {
            height = height.max(content.y);
        }
        height += self.caption_size.y;

        if let Some(content) = content {
            width += content.x;
        }
        width = width.max(self.caption_size.x);

        if model.validation_state() != ValidationState::Valid {
            width = width.max(self.validation_size.x);
            height += self.validation_size.y + self.spacing;
        }

        self.width = width;
        self.height = height;
    }

    fn port_width(
        &self,
        model: &dyn NodeModel,
        kind: PortKind,
        metrics: &dyn TextMetrics,
    ) -> f32 {
        (0..model.num_ports(kind))
            .map(|i| metrics.measure(&model.port_caption(kind, i), false).x)
            .fold(0.0, f32::max)
    }

    fn port_local_position(
        &self,
        model: &dyn NodeModel,
        style: &Style,
        kind: PortKind,
        index: usize,
    ) -> Pos2 {
        let point_diameter = style.node.connection_point_diameter;
        match style.layout_direction {
            LayoutDirection::Horizontal => {
                let step = self.entry_height + self.spacing;
                let y = self.caption_size.y + step * index as f32 + step / 2.0;
                let x = match kind {
                    PortKind::Input => -point_diameter,
                    PortKind::Output => self.width + point_diameter,
                };
                Pos2::new(x, y)
            }
            LayoutDirection::Vertical => {
                let count = model.num_ports(kind) as f32;
                let x = self.width / (count + 1.0) * (index + 1) as f32;
                let y = match kind {
                    PortKind::Input => -point_diameter,
                    PortKind::Output => self.height + point_diameter,
                };
                Pos2::new(x, y)
            }
        }
    }

    /// Scene position of the port at `(kind, index)`.
    ///
    /// Horizontal layout staggers ports vertically by index below the
    /// caption; vertical layout spreads them along the top/bottom edge by
    /// fractional index. The result is mapped through `transform`.
    pub fn port_scene_position(
        &self,
        model: &dyn NodeModel,
        style: &Style,
        kind: PortKind,
        index: usize,
        transform: SceneTransform,
    ) -> Pos2 {
        transform.apply(self.port_local_position(model, style, kind, index))
    }

    /// Find the port of `kind` within pick tolerance of a scene point.
    ///
    /// Linear scan in index order; the first hit wins, so ties break to the
    /// lowest index. Tolerance is twice the connection point diameter.
    pub fn check_hit_scene_point(
        &self,
        model: &dyn NodeModel,
        style: &Style,
        kind: PortKind,
        scene_point: Pos2,
        transform: SceneTransform,
    ) -> Option<usize> {
        let tolerance = 2.0 * style.node.connection_point_diameter;
        (0..model.num_ports(kind)).find(|&index| {
            let position = self.port_scene_position(model, style, kind, index, transform);
            position.distance(scene_point) < tolerance
        })
    }

    /// Node bounds in local coordinates, padded so dangling connection ends
    /// near the edge still repaint with the node
    pub fn bounding_rect(&self, style: &Style) -> Rect {
        let addon = 4.0 * style.node.connection_point_diameter;
        Rect::from_min_size(
            Pos2::new(-addon, -addon),
            Vec2::new(self.width + 2.0 * addon, self.height + 2.0 * addon),
        )
    }

    /// Corner handle for manual resize drags
    pub fn resize_rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.width - RESIZE_RECT_SIZE, self.height - RESIZE_RECT_SIZE),
            Vec2::splat(RESIZE_RECT_SIZE),
        )
    }

    /// Position of embedded content on the node surface, centered between
    /// the caption and the bottom edge (above the validation band when the
    /// model is not valid)
    pub fn content_position(&self, model: &dyn NodeModel) -> Pos2 {
        let Some(content) = model.embedded_content_size() else {
            return Pos2::ZERO;
        };
        let x = self.spacing + self.input_port_width;
        let reserved = if model.validation_state() != ValidationState::Valid {
            self.validation_size.y + self.spacing
        } else {
            0.0
        };
        let y = (self.caption_size.y + self.height - reserved - content.y) / 2.0;
        Pos2::new(x, y)
    }

    /// The tallest embedded content that fits without growing the node
    pub fn equivalent_content_height(&self, model: &dyn NodeModel) -> f32 {
        let base = self.height - self.caption_size.y;
        if model.validation_state() != ValidationState::Valid {
            base + self.validation_size.y
        } else {
            base
        }
    }
}

impl Default for NodeGeometry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PortSpec, StaticModel};
    use crate::port::DataType;

    fn float() -> DataType {
        DataType::new("float", "Float")
    }

    fn one_in_two_out() -> StaticModel {
        StaticModel::new("Split")
            .with_input(PortSpec::new(float()))
            .with_output(PortSpec::new(float()))
            .with_output(PortSpec::new(float()))
    }

    fn vertical_style() -> Style {
        Style {
            layout_direction: LayoutDirection::Vertical,
            ..Default::default()
        }
    }

    #[test]
    fn test_vertical_ports_spread_by_fractional_index() {
        let model = one_in_two_out();
        let style = vertical_style();
        let mut geometry = NodeGeometry::new();
        geometry.set_width(100.0);

        let out0 = geometry.port_scene_position(
            &model,
            &style,
            PortKind::Output,
            0,
            SceneTransform::IDENTITY,
        );
        let out1 = geometry.port_scene_position(
            &model,
            &style,
            PortKind::Output,
            1,
            SceneTransform::IDENTITY,
        );
        let inp = geometry.port_scene_position(
            &model,
            &style,
            PortKind::Input,
            0,
            SceneTransform::IDENTITY,
        );

        assert!((out0.x - 100.0 / 3.0).abs() < 0.01);
        assert!((out1.x - 200.0 / 3.0).abs() < 0.01);
        assert!((inp.x - 50.0).abs() < 0.01);
        // Inputs float above the top edge, outputs below the bottom edge.
        assert_eq!(inp.y, -style.node.connection_point_diameter);
        assert_eq!(
            out0.y,
            geometry.height() + style.node.connection_point_diameter
        );
    }

    #[test]
    fn test_horizontal_ports_stagger_by_index() {
        let model = StaticModel::new("Many")
            .with_input(PortSpec::new(float()))
            .with_input(PortSpec::new(float()))
            .with_input(PortSpec::new(float()));
        let style = Style::default();
        let geometry = NodeGeometry::new();

        let ys: Vec<f32> = (0..3)
            .map(|i| {
                geometry
                    .port_scene_position(
                        &model,
                        &style,
                        PortKind::Input,
                        i,
                        SceneTransform::IDENTITY,
                    )
                    .y
            })
            .collect();
        assert!(ys[0] < ys[1] && ys[1] < ys[2]);

        let x = geometry
            .port_scene_position(&model, &style, PortKind::Input, 0, SceneTransform::IDENTITY)
            .x;
        assert_eq!(x, -style.node.connection_point_diameter);
    }

    #[test]
    fn test_recalculate_size_horizontal() {
        let model = one_in_two_out();
        let style = Style::default();
        let metrics = FixedAdvanceMetrics::default();
        let mut geometry = NodeGeometry::new();
        geometry.recalculate_size(&model, &style, &metrics);

        // Two entries dominate: (16 + 20) * 2 rows + caption line.
        let expected_height = (16.0 + 20.0) * 2.0 + 16.0;
        assert_eq!(geometry.height(), expected_height);

        // "Float" at advance 8 on both sides, plus 2x spacing.
        let expected_width = 40.0 + 40.0 + 2.0 * 20.0;
        assert_eq!(geometry.width(), expected_width);
    }

    #[test]
    fn test_validation_band_reserves_space() {
        let valid = one_in_two_out();
        let broken = one_in_two_out()
            .with_validation(ValidationState::Error, "missing input value");
        let style = Style::default();
        let metrics = FixedAdvanceMetrics::default();

        let mut geometry = NodeGeometry::new();
        geometry.recalculate_size(&valid, &style, &metrics);
        let valid_height = geometry.height();

        geometry.recalculate_size(&broken, &style, &metrics);
        assert_eq!(
            geometry.height(),
            valid_height + metrics.line_height + style.node.spacing
        );
        assert!(geometry.width() >= metrics.measure("missing input value", true).x);
    }

    #[test]
    fn test_hidden_caption_takes_no_space() {
        let model = one_in_two_out().with_caption_hidden();
        let style = Style::default();
        let metrics = FixedAdvanceMetrics::default();
        let mut geometry = NodeGeometry::new();
        geometry.recalculate_size(&model, &style, &metrics);

        assert_eq!(geometry.caption_size(), Vec2::ZERO);
        assert_eq!(geometry.height(), (16.0 + 20.0) * 2.0);
    }

    #[test]
    fn test_embedded_content_grows_node() {
        let model = one_in_two_out().with_content_size(Vec2::new(120.0, 300.0));
        let style = Style::default();
        let metrics = FixedAdvanceMetrics::default();
        let mut geometry = NodeGeometry::new();
        geometry.recalculate_size(&model, &style, &metrics);

        assert_eq!(geometry.height(), 300.0 + geometry.caption_size().y);
        assert_eq!(geometry.width(), 40.0 + 40.0 + 40.0 + 120.0);
    }

    #[test]
    fn test_check_hit_scene_point_prefers_lowest_index() {
        let model = one_in_two_out();
        let style = vertical_style();
        let mut geometry = NodeGeometry::new();
        geometry.set_width(10.0);

        // Width 10 packs both outputs within one tolerance radius.
        let hit = geometry.check_hit_scene_point(
            &model,
            &style,
            PortKind::Output,
            Pos2::new(5.0, geometry.height() + style.node.connection_point_diameter),
            SceneTransform::IDENTITY,
        );
        assert_eq!(hit, Some(0));

        let miss = geometry.check_hit_scene_point(
            &model,
            &style,
            PortKind::Output,
            Pos2::new(500.0, 500.0),
            SceneTransform::IDENTITY,
        );
        assert_eq!(miss, None);
    }

    #[test]
    fn test_bounding_and_resize_rects() {
        let mut geometry = NodeGeometry::new();
        geometry.set_width(100.0);
        geometry.set_height(80.0);
        let style = Style::default();

        let bounds = geometry.bounding_rect(&style);
        let addon = 4.0 * style.node.connection_point_diameter;
        assert_eq!(bounds.min, Pos2::new(-addon, -addon));
        assert_eq!(bounds.width(), 100.0 + 2.0 * addon);

        let handle = geometry.resize_rect();
        assert_eq!(handle.max, Pos2::new(100.0, 80.0));
    }
}
