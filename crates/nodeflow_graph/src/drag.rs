// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-to-connect state machine.
//!
//! A drag holds one attached endpoint and one free endpoint following the
//! pointer. Dropping onto a port attaches iff the target's direction is the
//! free end's, its data type accepts the attached end's type, and its
//! policy leaves capacity. Any other drop cancels.

use crate::connection::{Connection, ConnectionId};
use crate::graph::{Graph, GraphError};
use crate::node::NodeId;
use crate::port::{DataType, PortAddress, PortKind};
use crate::state::ConnectionReaction;
use crate::style::SplineType;
use egui::Pos2;

/// How a drag ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// The free end attached to a port; the connection is complete
    Attached(ConnectionId),
    /// The drop was rejected or landed on empty space
    Cancelled {
        /// The connection was removed from the graph entirely
        discarded: bool,
    },
}

/// An in-progress connection drag.
///
/// Consumed by [`Self::drop_on`] or [`Self::cancel`]; both clear reaction
/// state before returning so no `Reacting` flag leaks into the next event.
#[derive(Debug)]
pub struct ConnectionDrag {
    connection: ConnectionId,
    origin: NodeId,
    free_kind: PortKind,
    data_type: DataType,
    sketch: bool,
}

impl ConnectionDrag {
    /// Start sketching a new connection from a port.
    ///
    /// The connection is created half-attached at `from` and registered on
    /// that port; the free end starts at `pointer`. Fails with
    /// `CapacityExceeded` when `from` cannot hold another connection.
    pub fn from_port(
        graph: &mut Graph,
        from: PortAddress,
        spline_type: SplineType,
        pointer: Pos2,
    ) -> Result<Self, GraphError> {
        let data_type = graph.port_data_type(from)?;
        let free_kind = from.kind.opposite();

        let mut connection = Connection::dangling(from, spline_type);
        connection.geometry.set_endpoint(from.kind, pointer);
        connection.geometry.set_endpoint(free_kind, pointer);
        let id = connection.id;

        attach_to_port(graph, from, id)?;
        graph.insert_connection(connection);

        set_reaction(graph, from.node, free_kind, data_type.clone());
        tracing::debug!(connection = ?id, ?from, "drag started");

        Ok(Self {
            connection: id,
            origin: from.node,
            free_kind,
            data_type,
            sketch: true,
        })
    }

    /// Grab one end of an existing, fully attached connection and start
    /// dragging it.
    pub fn grab_end(
        graph: &mut Graph,
        connection_id: ConnectionId,
        end: PortKind,
        pointer: Pos2,
    ) -> Result<Self, GraphError> {
        let connection = graph
            .connection(connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        let grabbed = connection
            .endpoint(end)
            .ok_or(GraphError::UninitializedEndpoint(connection_id, end))?;
        let kept = connection
            .endpoint(end.opposite())
            .ok_or(GraphError::UninitializedEndpoint(connection_id, end.opposite()))?;
        let data_type = graph.port_data_type(kept)?;

        detach_from_port(graph, grabbed, connection_id)?;
        if let Some(connection) = graph.connection_mut(connection_id) {
            connection.set_endpoint(end, None);
            connection.geometry.set_endpoint(end, pointer);
        }

        set_reaction(graph, kept.node, end, data_type.clone());
        tracing::debug!(connection = ?connection_id, ?grabbed, "endpoint grabbed");

        Ok(Self {
            connection: connection_id,
            origin: kept.node,
            free_kind: end,
            data_type,
            sketch: false,
        })
    }

    /// The connection being dragged
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Direction of the port the free end needs
    pub fn required_kind(&self) -> PortKind {
        self.free_kind
    }

    /// Data type carried by the attached end
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Track the pointer with the free end
    pub fn move_to(&self, graph: &mut Graph, pointer: Pos2) {
        if let Some(connection) = graph.connection_mut(self.connection) {
            connection.geometry.set_endpoint(self.free_kind, pointer);
        }
    }

    /// Finish the drag over `target` (or empty space).
    ///
    /// An accepted target attaches the free end; anything else cancels.
    pub fn drop_on(
        self,
        graph: &mut Graph,
        target: Option<PortAddress>,
    ) -> Result<DropOutcome, GraphError> {
        let Some(target) = target.filter(|t| self.target_accepts(graph, *t)) else {
            return Ok(self.cancel(graph));
        };

        attach_to_port(graph, target, self.connection)?;
        if let Some(connection) = graph.connection_mut(self.connection) {
            connection.set_endpoint(self.free_kind, Some(target));
        }

        clear_reaction(graph, self.origin);
        clear_reaction(graph, target.node);
        tracing::debug!(connection = ?self.connection, ?target, "drag attached");
        Ok(DropOutcome::Attached(self.connection))
    }

    /// Abort the drag.
    ///
    /// A sketched connection is discarded entirely; a re-grabbed one stays
    /// attached on the side it already had. Reaction state on the
    /// originating node is fully cleared either way.
    pub fn cancel(self, graph: &mut Graph) -> DropOutcome {
        clear_reaction(graph, self.origin);

        if !self.sketch {
            tracing::debug!(connection = ?self.connection, "drag cancelled");
            return DropOutcome::Cancelled { discarded: false };
        }

        if let Some(connection) = graph.connection(self.connection) {
            let fixed = connection.endpoint(self.free_kind.opposite());
            if let Some(address) = fixed {
                let _ = detach_from_port(graph, address, self.connection);
            }
        }
        graph.remove_connection(self.connection);
        tracing::debug!(connection = ?self.connection, "sketch discarded");
        DropOutcome::Cancelled { discarded: true }
    }

    fn target_accepts(&self, graph: &mut Graph, target: PortAddress) -> bool {
        if target.kind != self.free_kind {
            return false;
        }
        let Some(node) = graph.node_mut(target.node) else {
            return false;
        };
        let (model, state) = node.model_and_state();
        if target.index >= model.num_ports(target.kind) {
            return false;
        }
        if !model.can_connect(target.kind, target.index, &self.data_type) {
            return false;
        }
        let policy = model.connection_policy(target.kind, target.index);
        match state.port(model, target.kind, target.index) {
            Ok(Some(port)) => policy.allows(port.connections().len()),
            _ => false,
        }
    }
}

fn set_reaction(graph: &mut Graph, node: NodeId, free_kind: PortKind, data_type: DataType) {
    if let Some(node) = graph.node_mut(node) {
        node.state.set_reaction(ConnectionReaction::Reacting {
            port_kind: free_kind.opposite(),
            data_type,
        });
    }
}

fn clear_reaction(graph: &mut Graph, node: NodeId) {
    if let Some(node) = graph.node_mut(node) {
        node.state.clear_reaction();
    }
}

fn attach_to_port(
    graph: &mut Graph,
    address: PortAddress,
    connection: ConnectionId,
) -> Result<(), GraphError> {
    let node = graph
        .node_mut(address.node)
        .ok_or(GraphError::NodeNotFound(address.node))?;
    let (model, state) = node.model_and_state();
    let policy = model.connection_policy(address.kind, address.index);
    let port = state
        .port_mut(model, address.kind, address.index)?
        .ok_or(GraphError::PortNotFound(address))?;
    port.add_connection(connection, policy)?;
    Ok(())
}

fn detach_from_port(
    graph: &mut Graph,
    address: PortAddress,
    connection: ConnectionId,
) -> Result<(), GraphError> {
    let node = graph
        .node_mut(address.node)
        .ok_or(GraphError::NodeNotFound(address.node))?;
    let (model, state) = node.model_and_state();
    state.erase_connection(model, address.kind, address.index, connection)?;
    Ok(())
}
