// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only style configuration for nodes and connections.

use egui::Color32;
use serde::{Deserialize, Serialize};
use std::hash::{DefaultHasher, Hash, Hasher};

/// Direction the graph flows on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutDirection {
    /// Inputs on the left edge, outputs on the right
    Horizontal,
    /// Inputs on the top edge, outputs on the bottom
    Vertical,
}

/// Curve family used to render a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplineType {
    /// Straight segment from source to sink
    Linear,
    /// Cubic S-curve exiting/entering ports perpendicular to the node edge
    Cubic,
}

/// Node visual parameters
#[derive(Debug, Clone)]
pub struct NodeStyle {
    /// Vertical padding between port entries
    pub spacing: f32,
    /// Diameter of the connection end points; also offsets ports off the
    /// node edge
    pub connection_point_diameter: f32,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            spacing: 20.0,
            connection_point_diameter: 8.0,
        }
    }
}

/// Connection visual parameters
#[derive(Debug, Clone)]
pub struct ConnectionStyle {
    /// Width of the normal line
    pub line_width: f32,
    /// Width of the dashed construction line drawn mid-drag
    pub construction_line_width: f32,
    /// Diameter of the endpoint dots
    pub point_diameter: f32,
    /// Line color when no data-defined color applies
    pub normal_color: Color32,
    /// Line color for selected connections
    pub selected_color: Color32,
    /// Fat background color behind selected connections
    pub selected_halo_color: Color32,
    /// Fat background color behind hovered connections
    pub hovered_color: Color32,
    /// Color of the construction line and endpoint dots
    pub construction_color: Color32,
    /// Derive the normal color from the endpoint data types
    pub use_data_defined_colors: bool,
    /// Curve family for rendering and hit-testing
    pub spline_type: SplineType,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            line_width: 2.5,
            construction_line_width: 2.0,
            point_diameter: 8.0,
            normal_color: Color32::from_rgb(100, 100, 100),
            selected_color: Color32::from_rgb(100, 100, 100),
            selected_halo_color: Color32::from_rgb(255, 165, 0),
            hovered_color: Color32::from_rgb(200, 200, 200),
            construction_color: Color32::from_rgb(169, 169, 169),
            use_data_defined_colors: false,
            spline_type: SplineType::Cubic,
        }
    }
}

impl ConnectionStyle {
    /// Normal line color for a connection carrying `type_id`.
    ///
    /// When data-defined colors are enabled, a stable hue is derived from
    /// the type id so equal types always render in the same color.
    pub fn normal_color_for(&self, type_id: &str) -> Color32 {
        if !self.use_data_defined_colors {
            return self.normal_color;
        }
        let mut hasher = DefaultHasher::new();
        type_id.hash(&mut hasher);
        let hue = hasher.finish() % 360;
        hue_color(hue as f32)
    }
}

/// Complete editor style
#[derive(Debug, Clone, Default)]
pub struct Style {
    /// Direction the graph is laid out in
    pub layout_direction: LayoutDirection,
    /// Node visuals
    pub node: NodeStyle,
    /// Connection visuals
    pub connection: ConnectionStyle,
}

impl Default for LayoutDirection {
    fn default() -> Self {
        Self::Horizontal
    }
}

/// Darken a color by an integer factor scaled by 100, Qt style:
/// `darker(color, 200)` halves each channel.
pub fn darker(color: Color32, factor: u32) -> Color32 {
    let factor = factor.max(100);
    let scale = |c: u8| ((c as u32 * 100) / factor) as u8;
    Color32::from_rgba_unmultiplied(
        scale(color.r()),
        scale(color.g()),
        scale(color.b()),
        color.a(),
    )
}

/// Saturated color at `hue` degrees, used for data-defined connection colors
fn hue_color(hue: f32) -> Color32 {
    let h = (hue / 60.0) % 6.0;
    let x = (255.0 * (1.0 - (h % 2.0 - 1.0).abs())) as u8;
    match h as u32 {
        0 => Color32::from_rgb(255, x, 0),
        1 => Color32::from_rgb(x, 255, 0),
        2 => Color32::from_rgb(0, 255, x),
        3 => Color32::from_rgb(0, x, 255),
        4 => Color32::from_rgb(x, 0, 255),
        _ => Color32::from_rgb(255, 0, x),
    }
}
