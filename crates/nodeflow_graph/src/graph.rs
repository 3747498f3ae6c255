// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph container: the node table and the connection arena.
//!
//! Nodes own their state and geometry; connections live in an arena keyed
//! by id and ports reference them by id only, so the Port/Connection
//! back-reference cycle of naive designs never forms.

use crate::connection::{Connection, ConnectionId};
use crate::geometry::SceneTransform;
use crate::node::{Node, NodeId, NodeModel};
use crate::node_geometry::TextMetrics;
use crate::painter::{ConnectionPainter, ConnectionView, DrawCommand, PaintOptions};
use crate::port::{CapacityExceeded, DataType, PortAddress, PortKind};
use crate::state::PortReindexError;
use crate::style::{SplineType, Style};
use egui::{Pos2, Vec2};
use indexmap::IndexMap;

/// Errors raised by topology operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port index out of range for the node's model
    #[error("Port not found: {0:?}")]
    PortNotFound(PortAddress),

    /// Connection not found
    #[error("Connection not found: {0:?}")]
    ConnectionNotFound(ConnectionId),

    /// A port of the other direction was required
    #[error("Expected an {expected:?} port at {address:?}")]
    WrongPortKind {
        /// The offending address
        address: PortAddress,
        /// The direction that was required
        expected: PortKind,
    },

    /// The two ports' data types refuse the link
    #[error("Incompatible data types: {output} -> {input}")]
    IncompatibleDataType {
        /// Output-side type id
        output: String,
        /// Input-side type id
        input: String,
    },

    /// Port is at its policy's connection count
    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),

    /// A model shrink would orphan live connections
    #[error(transparent)]
    PortReindex(#[from] PortReindexError),

    /// Geometry or type query against an unattached connection end
    #[error("Connection {0:?} has no attached {1:?} endpoint")]
    UninitializedEndpoint(ConnectionId, PortKind),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

/// A node graph: insertion-ordered node table plus connection arena
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Add a node built from `model`, returning its id
    pub fn add_node(&mut self, model: Box<dyn NodeModel>) -> NodeId {
        let node = Node::new(model);
        let id = node.id;
        tracing::debug!(node = ?id, "adding node");
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node along with every connection touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let involved: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(node_id))
            .map(|c| c.id)
            .collect();
        for connection in involved {
            let _ = self.disconnect(connection);
        }
        tracing::debug!(node = ?node_id, "removing node");
        self.nodes.swap_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get a mutable connection by ID
    pub fn connection_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&connection_id)
    }

    /// All connections, in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections attached at a specific port
    pub fn connections_at(&self, address: PortAddress) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(move |c| c.involves_port(address))
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Reconcile a node's port collections against its model and repoint
    /// any moved connection endpoints in the arena.
    ///
    /// Propagates [`PortReindexError`] untouched: a failed shrink leaves
    /// both the node state and the arena exactly as they were.
    pub fn reconcile_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let (model, state) = node.model_and_state();
        state.reconcile(model)?;
        self.apply_pending_remaps(node_id);
        Ok(())
    }

    /// Repoint arena endpoints that a reconcile moved to new ports
    fn apply_pending_remaps(&mut self, node_id: NodeId) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        for remap in node.state.take_endpoint_remaps() {
            if let Some(connection) = self.connections.get_mut(&remap.connection) {
                connection.set_endpoint(remap.endpoint.kind, Some(remap.endpoint));
            }
        }
    }

    /// Data type declared by the model at a port address
    pub fn port_data_type(&self, address: PortAddress) -> Result<DataType, GraphError> {
        let node = self
            .nodes
            .get(&address.node)
            .ok_or(GraphError::NodeNotFound(address.node))?;
        if address.index >= node.model().num_ports(address.kind) {
            return Err(GraphError::PortNotFound(address));
        }
        Ok(node.model().data_type(address.kind, address.index))
    }

    /// Data type at one end of a connection
    pub fn connection_data_type(
        &self,
        connection_id: ConnectionId,
        kind: PortKind,
    ) -> Result<DataType, GraphError> {
        let connection = self
            .connections
            .get(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        let address = connection
            .endpoint(kind)
            .ok_or(GraphError::UninitializedEndpoint(connection_id, kind))?;
        self.port_data_type(address)
    }

    /// Create a connection between an output and an input port.
    ///
    /// Everything is validated before anything mutates: port directions,
    /// self-loop, data-type compatibility on both models, and remaining
    /// capacity on both ports.
    pub fn connect(
        &mut self,
        output: PortAddress,
        input: PortAddress,
        spline_type: SplineType,
    ) -> Result<ConnectionId, GraphError> {
        if output.kind != PortKind::Output {
            return Err(GraphError::WrongPortKind {
                address: output,
                expected: PortKind::Output,
            });
        }
        if input.kind != PortKind::Input {
            return Err(GraphError::WrongPortKind {
                address: input,
                expected: PortKind::Input,
            });
        }
        if output.node == input.node {
            return Err(GraphError::SelfLoop);
        }

        self.reconcile_node(output.node)?;
        self.reconcile_node(input.node)?;

        let output_type = self.port_data_type(output)?;
        let input_type = self.port_data_type(input)?;
        let accepts = |addr: PortAddress, other: &DataType| {
            self.nodes[&addr.node]
                .model()
                .can_connect(addr.kind, addr.index, other)
        };
        if !accepts(input, &output_type) || !accepts(output, &input_type) {
            return Err(GraphError::IncompatibleDataType {
                output: output_type.id,
                input: input_type.id,
            });
        }

        for address in [output, input] {
            let node = &mut self.nodes[&address.node];
            let (model, state) = node.model_and_state();
            let policy = model.connection_policy(address.kind, address.index);
            let port = state
                .port(model, address.kind, address.index)?
                .ok_or(GraphError::PortNotFound(address))?;
            if !policy.allows(port.connections().len()) {
                return Err(GraphError::CapacityExceeded(CapacityExceeded {
                    address,
                    current: port.connections().len(),
                }));
            }
        }

        let connection = Connection::new(output, input, spline_type);
        let id = connection.id;
        for address in [output, input] {
            let node = &mut self.nodes[&address.node];
            let (model, state) = node.model_and_state();
            let policy = model.connection_policy(address.kind, address.index);
            if let Some(port) = state.port_mut(model, address.kind, address.index)? {
                port.add_connection(id, policy)?;
            }
        }
        tracing::debug!(connection = ?id, ?output, ?input, "connected");
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Remove a connection, detaching it from any ports it touches
    pub fn disconnect(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Connection, GraphError> {
        let connection = self
            .connections
            .swap_remove(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        for kind in [PortKind::Output, PortKind::Input] {
            if let Some(address) = connection.endpoint(kind) {
                if let Some(node) = self.nodes.get_mut(&address.node) {
                    let (model, state) = node.model_and_state();
                    state.erase_connection(
                        model,
                        address.kind,
                        address.index,
                        connection_id,
                    )?;
                    self.apply_pending_remaps(address.node);
                }
            }
        }
        tracing::debug!(connection = ?connection_id, "disconnected");
        Ok(connection)
    }

    pub(crate) fn insert_connection(&mut self, connection: Connection) {
        self.connections.insert(connection.id, connection);
    }

    pub(crate) fn remove_connection(&mut self, connection_id: ConnectionId) {
        self.connections.swap_remove(&connection_id);
    }

    /// Transform mapping a node's local coordinates into the scene under
    /// `view`: the node offset folded into the view transform
    pub fn node_transform(&self, node_id: NodeId, view: SceneTransform) -> Option<SceneTransform> {
        let node = self.nodes.get(&node_id)?;
        Some(SceneTransform::new(
            view.scale,
            view.apply(node.position).to_vec2(),
        ))
    }

    /// Scene position of a port under a view transform
    pub fn port_scene_position(
        &self,
        address: PortAddress,
        style: &Style,
        view: SceneTransform,
    ) -> Result<Pos2, GraphError> {
        let node = self
            .nodes
            .get(&address.node)
            .ok_or(GraphError::NodeNotFound(address.node))?;
        if address.index >= node.model().num_ports(address.kind) {
            return Err(GraphError::PortNotFound(address));
        }
        let transform = self
            .node_transform(address.node, view)
            .ok_or(GraphError::NodeNotFound(address.node))?;
        Ok(node.geometry.port_scene_position(
            node.model(),
            style,
            address.kind,
            address.index,
            transform,
        ))
    }

    /// Find a port of `kind` on `node_id` within pick tolerance of a scene
    /// point
    pub fn check_hit_port(
        &self,
        node_id: NodeId,
        kind: PortKind,
        scene_point: Pos2,
        style: &Style,
        view: SceneTransform,
    ) -> Option<PortAddress> {
        let node = self.nodes.get(&node_id)?;
        let transform = self.node_transform(node_id, view)?;
        node.geometry
            .check_hit_scene_point(node.model(), style, kind, scene_point, transform)
            .map(|index| PortAddress::new(node_id, kind, index))
    }

    /// Topmost connection whose stroked path contains `scene_point`
    pub fn check_hit_connection(
        &self,
        scene_point: Pos2,
        style: &Style,
    ) -> Option<ConnectionId> {
        self.connections
            .values()
            .rev()
            .find(|c| c.geometry.hit_test(scene_point, style.layout_direction))
            .map(|c| c.id)
    }

    /// Reconcile a node and recompute its derived size.
    ///
    /// Must run before the node or its connections are painted in the same
    /// event cycle.
    pub fn refresh_node_geometry(
        &mut self,
        node_id: NodeId,
        style: &Style,
        metrics: &dyn TextMetrics,
    ) -> Result<(), GraphError> {
        self.reconcile_node(node_id)?;
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let (model, geometry) = node.model_and_geometry();
        geometry.recalculate_size(model, style, metrics);
        Ok(())
    }

    /// Recompute a connection's curve endpoints from its attached ports.
    ///
    /// Unattached ends are left where the drag put them.
    pub fn sync_connection_geometry(
        &mut self,
        connection_id: ConnectionId,
        style: &Style,
        view: SceneTransform,
    ) -> Result<(), GraphError> {
        let connection = self
            .connections
            .get(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        let mut positions = [None, None];
        for (slot, kind) in [PortKind::Output, PortKind::Input].into_iter().enumerate() {
            if let Some(address) = connection.endpoint(kind) {
                positions[slot] = Some(self.port_scene_position(address, style, view)?);
            }
        }
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        connection.geometry.set_spline_type(style.connection.spline_type);
        for (slot, kind) in [PortKind::Output, PortKind::Input].into_iter().enumerate() {
            if let Some(position) = positions[slot] {
                connection.geometry.set_endpoint(kind, position);
            }
        }
        Ok(())
    }

    /// Compose the draw commands for one connection
    pub fn paint_connection(
        &self,
        connection_id: ConnectionId,
        style: &Style,
        options: PaintOptions,
    ) -> Result<Vec<DrawCommand>, GraphError> {
        let connection = self
            .connections
            .get(&connection_id)
            .ok_or(GraphError::ConnectionNotFound(connection_id))?;
        let resolve = |kind: PortKind| {
            connection
                .endpoint(kind)
                .and_then(|address| self.port_data_type(address).ok())
        };
        let output_type = resolve(PortKind::Output);
        let input_type = resolve(PortKind::Input);
        let view = ConnectionView {
            geometry: &connection.geometry,
            mid_drag: !connection.is_complete(),
            output_type: output_type.as_ref(),
            input_type: input_type.as_ref(),
        };
        Ok(ConnectionPainter::paint(
            view,
            &style.connection,
            style.layout_direction,
            options,
        ))
    }

    /// Canvas position that centers a node of `size` halfway between two
    /// ports, used when inserting a converter node on an existing link
    pub fn position_between_ports(
        &self,
        source: PortAddress,
        target: PortAddress,
        size: Vec2,
        style: &Style,
    ) -> Result<Pos2, GraphError> {
        let a = self.port_scene_position(source, style, SceneTransform::IDENTITY)?;
        let b = self.port_scene_position(target, style, SceneTransform::IDENTITY)?;
        let center = ((a.to_vec2() + b.to_vec2()) / 2.0).to_pos2();
        Ok(center - size / 2.0)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DynamicOutputModel, PortSpec, StaticModel};
    use crate::port::ConnectionPolicy;

    fn float() -> DataType {
        DataType::new("float", "Float")
    }

    fn source_node() -> StaticModel {
        StaticModel::new("Source").with_output(PortSpec::new(float()))
    }

    fn sink_node() -> StaticModel {
        StaticModel::new("Sink").with_input(PortSpec::new(float()))
    }

    fn out(node: NodeId, index: usize) -> PortAddress {
        PortAddress::new(node, PortKind::Output, index)
    }

    fn inp(node: NodeId, index: usize) -> PortAddress {
        PortAddress::new(node, PortKind::Input, index)
    }

    #[test]
    fn test_connect_and_disconnect() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(source_node()));
        let b = graph.add_node(Box::new(sink_node()));

        let id = graph
            .connect(out(a, 0), inp(b, 0), SplineType::Cubic)
            .unwrap();
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.connection(id).unwrap().is_complete());

        let node = graph.node_mut(b).unwrap();
        let (model, state) = node.model_and_state();
        assert_eq!(state.connections(model, PortKind::Input, 0).unwrap(), vec![id]);

        graph.disconnect(id).unwrap();
        assert_eq!(graph.connection_count(), 0);
        let node = graph.node_mut(b).unwrap();
        let (model, state) = node.model_and_state();
        assert!(state.connections(model, PortKind::Input, 0).unwrap().is_empty());
    }

    #[test]
    fn test_connect_rejects_incompatible_types() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(source_node()));
        let b = graph.add_node(Box::new(
            StaticModel::new("IntSink").with_input(PortSpec::new(DataType::new("int", "Int"))),
        ));

        let err = graph
            .connect(out(a, 0), inp(b, 0), SplineType::Cubic)
            .unwrap_err();
        assert!(matches!(err, GraphError::IncompatibleDataType { .. }));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_connect_rejects_full_input() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(source_node()));
        let b = graph.add_node(Box::new(source_node()));
        let c = graph.add_node(Box::new(sink_node()));

        graph.connect(out(a, 0), inp(c, 0), SplineType::Cubic).unwrap();
        let err = graph
            .connect(out(b, 0), inp(c, 0), SplineType::Cubic)
            .unwrap_err();
        assert!(matches!(err, GraphError::CapacityExceeded(_)));
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_connect_rejects_self_loop_and_wrong_kinds() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(
            StaticModel::new("Both")
                .with_input(PortSpec::new(float()))
                .with_output(PortSpec::new(float())),
        ));
        let b = graph.add_node(Box::new(sink_node()));

        let err = graph
            .connect(out(a, 0), inp(a, 0), SplineType::Cubic)
            .unwrap_err();
        assert!(matches!(err, GraphError::SelfLoop));

        let err = graph
            .connect(inp(b, 0), inp(b, 0), SplineType::Cubic)
            .unwrap_err();
        assert!(matches!(err, GraphError::WrongPortKind { .. }));
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(source_node()));
        let b = graph.add_node(Box::new(sink_node()));
        let id = graph
            .connect(out(a, 0), inp(b, 0), SplineType::Cubic)
            .unwrap();

        graph.remove_node(a);
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.connection(id).is_none());

        // The surviving node's port no longer references the connection.
        let node = graph.node_mut(b).unwrap();
        let (model, state) = node.model_and_state();
        assert!(state.connections(model, PortKind::Input, 0).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_repoints_arena_endpoints() {
        let mut graph = Graph::new();
        let (model, count) = DynamicOutputModel::new(
            StaticModel::new("Fan"),
            PortSpec::new(float()).with_policy(ConnectionPolicy::Many),
            3,
        );
        let a = graph.add_node(Box::new(model));
        let b = graph.add_node(Box::new(sink_node()));

        // Attach from output index 2, then shrink to a single output.
        let id = graph
            .connect(out(a, 2), inp(b, 0), SplineType::Cubic)
            .unwrap();
        count.set(1);
        graph.reconcile_node(a).unwrap();

        let connection = graph.connection(id).unwrap();
        assert_eq!(connection.endpoint(PortKind::Output), Some(out(a, 0)));

        let node = graph.node_mut(a).unwrap();
        let (model, state) = node.model_and_state();
        assert_eq!(state.connections(model, PortKind::Output, 0).unwrap(), vec![id]);
    }

    #[test]
    fn test_reconcile_shrink_failure_propagates() {
        let mut graph = Graph::new();
        let (model, count) = DynamicOutputModel::new(
            StaticModel::new("Fan"),
            PortSpec::new(float()),
            3,
        );
        let a = graph.add_node(Box::new(model));
        let sinks: Vec<NodeId> = (0..3)
            .map(|_| graph.add_node(Box::new(sink_node())))
            .collect();
        for (i, sink) in sinks.iter().enumerate() {
            graph
                .connect(out(a, i), inp(*sink, 0), SplineType::Cubic)
                .unwrap();
        }

        count.set(2);
        let err = graph.reconcile_node(a).unwrap_err();
        assert!(matches!(err, GraphError::PortReindex(_)));
        // All three links survived untouched.
        assert_eq!(graph.connection_count(), 3);
    }

    #[test]
    fn test_uninitialized_endpoint_is_reported_not_fatal() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(source_node()));
        let dangling = Connection::dangling(out(a, 0), SplineType::Cubic);
        let id = dangling.id;
        graph.insert_connection(dangling);

        let err = graph
            .connection_data_type(id, PortKind::Input)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::UninitializedEndpoint(_, PortKind::Input)
        ));
        assert!(graph
            .connection_data_type(id, PortKind::Output)
            .is_ok());
    }

    #[test]
    fn test_port_scene_position_respects_node_offset() {
        let mut graph = Graph::new();
        let a = graph.add_node(Box::new(source_node()));
        graph.node_mut(a).unwrap().position = Pos2::new(100.0, 50.0);
        let style = Style::default();

        let at_origin = {
            let node = graph.node(a).unwrap();
            node.geometry.port_scene_position(
                node.model(),
                &style,
                PortKind::Output,
                0,
                SceneTransform::IDENTITY,
            )
        };
        let in_scene = graph
            .port_scene_position(out(a, 0), &style, SceneTransform::IDENTITY)
            .unwrap();
        assert_eq!(in_scene, Pos2::new(at_origin.x + 100.0, at_origin.y + 50.0));
    }
}
