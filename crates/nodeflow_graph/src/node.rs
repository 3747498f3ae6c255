// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node identity, the node-model capability interface and the per-node
//! aggregate.

use crate::node_geometry::NodeGeometry;
use crate::port::{ConnectionPolicy, DataType, PortKind};
use crate::state::NodeState;
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Model-reported node health, affecting layout and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationState {
    /// Node is healthy; no validation band is shown
    Valid,
    /// Node works but with caveats
    Warning,
    /// Node is misconfigured
    Error,
}

/// Capability interface every node type implements.
///
/// `num_ports` may vary over time (dynamic-port models); callers must
/// re-query on every access rather than cache the count. [`NodeState`]
/// reconciles its port collections against the live count before any read
/// or mutation.
pub trait NodeModel {
    /// Number of ports of the given direction, reported live
    fn num_ports(&self, kind: PortKind) -> usize;

    /// Data type of the port at `(kind, index)`
    fn data_type(&self, kind: PortKind, index: usize) -> DataType;

    /// Display text for the port, measured when sizing the node.
    ///
    /// Defaults to the data type name.
    fn port_caption(&self, kind: PortKind, index: usize) -> String {
        self.data_type(kind, index).name
    }

    /// Connection capacity policy for the port at `(kind, index)`.
    ///
    /// Defaults to one connection for inputs, many for outputs.
    fn connection_policy(&self, kind: PortKind, index: usize) -> ConnectionPolicy {
        let _ = index;
        match kind {
            PortKind::Input => ConnectionPolicy::One,
            PortKind::Output => ConnectionPolicy::Many,
        }
    }

    /// Whether the port at `(kind, index)` accepts a link carrying `other`.
    ///
    /// Defaults to exact type-id equality; models with generic ports can
    /// widen this.
    fn can_connect(&self, kind: PortKind, index: usize, other: &DataType) -> bool {
        self.data_type(kind, index).id == other.id
    }

    /// Node title
    fn caption(&self) -> String;

    /// Whether the caption is drawn (and measured)
    fn caption_visible(&self) -> bool {
        true
    }

    /// Current validation state
    fn validation_state(&self) -> ValidationState {
        ValidationState::Valid
    }

    /// Message displayed in the validation band when not [`ValidationState::Valid`]
    fn validation_message(&self) -> String {
        String::new()
    }

    /// Size of embedded content drawn on the node body, if any
    fn embedded_content_size(&self) -> Option<Vec2> {
        None
    }
}

/// A node instance: model plus the state and geometry derived from it.
///
/// The node exclusively owns its [`NodeState`] and [`NodeGeometry`]; both
/// share its lifetime.
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Position of the node's top-left corner on the canvas
    pub position: Pos2,
    /// Topology state: port collections and reaction flags
    pub state: NodeState,
    /// Derived layout cache
    pub geometry: NodeGeometry,
    model: Box<dyn NodeModel>,
}

impl Node {
    /// Create a node from a model, placed at the origin
    pub fn new(model: Box<dyn NodeModel>) -> Self {
        let id = NodeId::new();
        let state = NodeState::new(id, model.as_ref());
        Self {
            id,
            position: Pos2::ZERO,
            state,
            geometry: NodeGeometry::new(),
            model,
        }
    }

    /// Set the canvas position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Pos2::new(x, y);
        self
    }

    /// The node's model
    pub fn model(&self) -> &dyn NodeModel {
        self.model.as_ref()
    }

    /// Split borrow: model alongside mutable state.
    ///
    /// Accessors on [`NodeState`] take the model as a parameter so they can
    /// reconcile before reading; this hands both out at once.
    pub fn model_and_state(&mut self) -> (&dyn NodeModel, &mut NodeState) {
        (self.model.as_ref(), &mut self.state)
    }

    /// Split borrow: model alongside mutable geometry
    pub fn model_and_geometry(&mut self) -> (&dyn NodeModel, &mut NodeGeometry) {
        (self.model.as_ref(), &mut self.geometry)
    }
}
