// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::geometry::ConnectionGeometry;
use crate::node::NodeId;
use crate::port::{PortAddress, PortKind};
use crate::style::SplineType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// An edge joining an output port to an input port.
///
/// While being dragged a connection is legitimately half-attached: one
/// endpoint holds a port address, the other is `None` and its geometry
/// endpoint follows the pointer.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Curve endpoints, hover flag and spline type
    pub geometry: ConnectionGeometry,
    output: Option<PortAddress>,
    input: Option<PortAddress>,
}

impl Connection {
    /// Create a connection attached at both ends
    pub fn new(output: PortAddress, input: PortAddress, spline_type: SplineType) -> Self {
        Self {
            id: ConnectionId::new(),
            geometry: ConnectionGeometry::new(spline_type),
            output: Some(output),
            input: Some(input),
        }
    }

    /// Create a half-attached connection for a drag in progress
    pub fn dangling(fixed: PortAddress, spline_type: SplineType) -> Self {
        let mut connection = Self {
            id: ConnectionId::new(),
            geometry: ConnectionGeometry::new(spline_type),
            output: None,
            input: None,
        };
        connection.set_endpoint(fixed.kind, Some(fixed));
        connection
    }

    /// The endpoint address on one side, if attached
    pub fn endpoint(&self, kind: PortKind) -> Option<PortAddress> {
        match kind {
            PortKind::Output => self.output,
            PortKind::Input => self.input,
        }
    }

    /// Attach or detach one side
    pub fn set_endpoint(&mut self, kind: PortKind, address: Option<PortAddress>) {
        match kind {
            PortKind::Output => self.output = address,
            PortKind::Input => self.input = address,
        }
    }

    /// Which side still needs a port, if any
    pub fn required_kind(&self) -> Option<PortKind> {
        match (self.output, self.input) {
            (None, _) => Some(PortKind::Output),
            (_, None) => Some(PortKind::Input),
            _ => None,
        }
    }

    /// Whether both endpoints are attached
    pub fn is_complete(&self) -> bool {
        self.output.is_some() && self.input.is_some()
    }

    /// Whether this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.output.is_some_and(|a| a.node == node_id)
            || self.input.is_some_and(|a| a.node == node_id)
    }

    /// Whether this connection is attached at a specific port
    pub fn involves_port(&self, address: PortAddress) -> bool {
        self.output == Some(address) || self.input == Some(address)
    }
}
