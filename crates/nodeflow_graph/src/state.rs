// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node topology state: port collections kept consistent with the
//! model's live-reported port counts, plus transient interaction flags.

use crate::connection::ConnectionId;
use crate::node::{NodeId, NodeModel};
use crate::port::{DataType, Port, PortAddress, PortKind};

/// Transient per-node flag indicating an in-progress connection drag
/// targeting one of its ports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionReaction {
    /// No drag in progress
    NotReacting,
    /// A dragged connection may land on this node
    Reacting {
        /// Opposite of the dragged (free) end's direction
        port_kind: PortKind,
        /// Data type of the drag's attached end
        data_type: DataType,
    },
}

/// The model reported a port-count shrink that would orphan live
/// connections.
///
/// Fatal: the model configuration is invalid and cannot be safely
/// repaired — silently dropping user-made connections is unacceptable. The
/// port collections are left untouched.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "Gathered too many {kind:?} ports to reconnect on node {node:?} \
     ({live} non-empty into {target} ports)"
)]
pub struct PortReindexError {
    /// Node whose model shrank
    pub node: NodeId,
    /// Direction being re-indexed
    pub kind: PortKind,
    /// Number of ports holding at least one connection
    pub live: usize,
    /// Port count the model now reports
    pub target: usize,
}

/// A connection endpoint that moved to a new port during re-indexing.
///
/// Ports store connection ids only; the owning [`crate::graph::Graph`]
/// applies these to its connection arena so each moved connection points at
/// its new port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointRemap {
    /// Connection whose endpoint moved
    pub connection: ConnectionId,
    /// The endpoint's new address
    pub endpoint: PortAddress,
}

/// Ordered input/output port collections for one node.
///
/// Every accessor reconciles the collections against the model's
/// live-reported port count before reading or mutating, so callers never
/// observe a stale count. Reconciliation is idempotent.
#[derive(Debug)]
pub struct NodeState {
    node: NodeId,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    pending_remaps: Vec<EndpointRemap>,
    reaction: ConnectionReaction,
    resizing: bool,
}

impl NodeState {
    /// Build the initial port collections from the model's current counts
    pub fn new(node: NodeId, model: &dyn NodeModel) -> Self {
        let build = |kind: PortKind| {
            (0..model.num_ports(kind))
                .map(|i| Port::new(node, kind, i))
                .collect()
        };
        Self {
            node,
            inputs: build(PortKind::Input),
            outputs: build(PortKind::Output),
            pending_remaps: Vec::new(),
            reaction: ConnectionReaction::NotReacting,
            resizing: false,
        }
    }

    /// The owning node
    pub fn node(&self) -> NodeId {
        self.node
    }

    fn bank(&self, kind: PortKind) -> &Vec<Port> {
        match kind {
            PortKind::Input => &self.inputs,
            PortKind::Output => &self.outputs,
        }
    }

    fn bank_mut(&mut self, kind: PortKind) -> &mut Vec<Port> {
        match kind {
            PortKind::Input => &mut self.inputs,
            PortKind::Output => &mut self.outputs,
        }
    }

    /// Bring the port collections in line with the model's reported counts.
    ///
    /// Growing appends fresh ports and never disturbs existing ones, so
    /// attached connections keep their port identity. Shrinking first
    /// gathers the connection lists of all non-empty ports in index order,
    /// fails with [`PortReindexError`] if more non-empty ports exist than
    /// the new count can hold (before any mutation is observable), then
    /// rebuilds ports `0..target` and reattaches the gathered lists in
    /// their original relative order. Endpoint moves are queued for
    /// [`Self::take_endpoint_remaps`].
    pub fn reconcile(&mut self, model: &dyn NodeModel) -> Result<(), PortReindexError> {
        for kind in [PortKind::Input, PortKind::Output] {
            let target = model.num_ports(kind);
            let current = self.bank(kind).len();
            if target == current {
                continue;
            }

            if target > current {
                tracing::debug!(node = ?self.node, ?kind, current, target, "growing ports");
                let node = self.node;
                let bank = self.bank_mut(kind);
                for i in current..target {
                    bank.push(Port::new(node, kind, i));
                }
                continue;
            }

            // Shrinking: gather connections per non-empty port, in index order.
            let gathered: Vec<Vec<ConnectionId>> = self
                .bank(kind)
                .iter()
                .filter(|port| !port.connections().is_empty())
                .map(|port| port.connections().to_vec())
                .collect();

            if gathered.len() > target {
                return Err(PortReindexError {
                    node: self.node,
                    kind,
                    live: gathered.len(),
                    target,
                });
            }

            tracing::debug!(
                node = ?self.node,
                ?kind,
                current,
                target,
                live = gathered.len(),
                "shrinking ports"
            );

            let node = self.node;
            let mut fresh: Vec<Port> =
                (0..target).map(|i| Port::new(node, kind, i)).collect();
            for (port, connections) in fresh.iter_mut().zip(gathered) {
                for connection in connections {
                    self.pending_remaps.push(EndpointRemap {
                        connection,
                        endpoint: port.address(),
                    });
                    port.push_connection(connection);
                }
            }
            *self.bank_mut(kind) = fresh;
        }
        Ok(())
    }

    /// Drain endpoint moves produced by re-indexing.
    ///
    /// The graph container applies these to its connection arena after any
    /// state access that may have reconciled.
    pub fn take_endpoint_remaps(&mut self) -> Vec<EndpointRemap> {
        std::mem::take(&mut self.pending_remaps)
    }

    /// Ports of one direction, reconciled and in index order
    pub fn ports(
        &mut self,
        model: &dyn NodeModel,
        kind: PortKind,
    ) -> Result<&[Port], PortReindexError> {
        self.reconcile(model)?;
        Ok(self.bank(kind).as_slice())
    }

    /// The port at `(kind, index)`, if the index is in range
    pub fn port(
        &mut self,
        model: &dyn NodeModel,
        kind: PortKind,
        index: usize,
    ) -> Result<Option<&Port>, PortReindexError> {
        self.reconcile(model)?;
        Ok(self.bank(kind).get(index))
    }

    pub(crate) fn port_mut(
        &mut self,
        model: &dyn NodeModel,
        kind: PortKind,
        index: usize,
    ) -> Result<Option<&mut Port>, PortReindexError> {
        self.reconcile(model)?;
        Ok(self.bank_mut(kind).get_mut(index))
    }

    /// Connections attached at `(kind, index)`, in attachment order
    pub fn connections(
        &mut self,
        model: &dyn NodeModel,
        kind: PortKind,
        index: usize,
    ) -> Result<Vec<ConnectionId>, PortReindexError> {
        Ok(self
            .port(model, kind, index)?
            .map(|port| port.connections().to_vec())
            .unwrap_or_default())
    }

    /// All connections on this node, inputs first
    pub fn all_connections(
        &mut self,
        model: &dyn NodeModel,
    ) -> Result<Vec<ConnectionId>, PortReindexError> {
        self.reconcile(model)?;
        Ok(self
            .inputs
            .iter()
            .chain(self.outputs.iter())
            .flat_map(|port| port.connections().iter().copied())
            .collect())
    }

    /// Detach a connection from `(kind, index)`; no-op if absent
    pub fn erase_connection(
        &mut self,
        model: &dyn NodeModel,
        kind: PortKind,
        index: usize,
        connection: ConnectionId,
    ) -> Result<(), PortReindexError> {
        self.reconcile(model)?;
        if let Some(port) = self.bank_mut(kind).get_mut(index) {
            port.remove_connection(connection);
        }
        Ok(())
    }

    /// Current reaction state
    pub fn reaction(&self) -> &ConnectionReaction {
        &self.reaction
    }

    /// Whether a dragged connection is currently targeting this node
    pub fn is_reacting(&self) -> bool {
        matches!(self.reaction, ConnectionReaction::Reacting { .. })
    }

    /// Set the reaction state
    pub fn set_reaction(&mut self, reaction: ConnectionReaction) {
        self.reaction = reaction;
    }

    /// Clear any reaction state
    pub fn clear_reaction(&mut self) {
        self.reaction = ConnectionReaction::NotReacting;
    }

    /// Whether a manual resize drag is in progress
    pub fn resizing(&self) -> bool {
        self.resizing
    }

    /// Set the resize-drag flag
    pub fn set_resizing(&mut self, resizing: bool) {
        self.resizing = resizing;
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

    fn dynamic_outputs(initial: usize) -> (DynamicOutputModel, std::rc::Rc<std::cell::Cell<usize>>)
    {
        DynamicOutputModel::new(
            StaticModel::new("Dyn").with_input(PortSpec::new(float())),
            PortSpec::new(float()),
            initial,
        )
    }

    #[test]
    fn test_growth_appends_without_disturbing() {
        let (model, count) = dynamic_outputs(2);
        let node = NodeId::new();
        let mut state = NodeState::new(node, &model);

        let c0 = ConnectionId::new();
        let c1 = ConnectionId::new();
        state
            .port_mut(&model, PortKind::Output, 0)
            .unwrap()
            .unwrap()
            .add_connection(c0, ConnectionPolicy::Many)
            .unwrap();
        state
            .port_mut(&model, PortKind::Output, 1)
            .unwrap()
            .unwrap()
            .add_connection(c1, ConnectionPolicy::Many)
            .unwrap();

        count.set(5);
        let ports = state.ports(&model, PortKind::Output).unwrap();
        assert_eq!(ports.len(), 5);
        assert_eq!(ports[0].connections(), &[c0]);
        assert_eq!(ports[1].connections(), &[c1]);
        assert!(ports[2].connections().is_empty());
        // Growth moves nothing.
        assert!(state.take_endpoint_remaps().is_empty());
    }

    #[test]
    fn test_shrink_reattaches_in_relative_order() {
        let (model, count) = dynamic_outputs(4);
        let node = NodeId::new();
        let mut state = NodeState::new(node, &model);

        // Connections at sparse indices 1 and 3.
        let c1 = ConnectionId::new();
        let c3 = ConnectionId::new();
        for (idx, conn) in [(1, c1), (3, c3)] {
            state
                .port_mut(&model, PortKind::Output, idx)
                .unwrap()
                .unwrap()
                .add_connection(conn, ConnectionPolicy::Many)
                .unwrap();
        }

        count.set(2);
        let ports = state.ports(&model, PortKind::Output).unwrap();
        assert_eq!(ports.len(), 2);
        // Compacted first-to-first, original relative order preserved.
        assert_eq!(ports[0].connections(), &[c1]);
        assert_eq!(ports[1].connections(), &[c3]);

        let remaps = state.take_endpoint_remaps();
        assert_eq!(remaps.len(), 2);
        assert_eq!(remaps[0].connection, c1);
        assert_eq!(remaps[0].endpoint, PortAddress::new(node, PortKind::Output, 0));
        assert_eq!(remaps[1].connection, c3);
        assert_eq!(remaps[1].endpoint, PortAddress::new(node, PortKind::Output, 1));
    }

    #[test]
    fn test_shrink_with_too_many_live_ports_fails_before_mutation() {
        let (model, count) = dynamic_outputs(3);
        let node = NodeId::new();
        let mut state = NodeState::new(node, &model);

        let conns: Vec<ConnectionId> = (0..3).map(|_| ConnectionId::new()).collect();
        for (idx, conn) in conns.iter().enumerate() {
            state
                .port_mut(&model, PortKind::Output, idx)
                .unwrap()
                .unwrap()
                .add_connection(*conn, ConnectionPolicy::Many)
                .unwrap();
        }

        count.set(2);
        let err = state.reconcile(&model).unwrap_err();
        assert_eq!(err.live, 3);
        assert_eq!(err.target, 2);

        // No port was rebuilt: the pre-shrink layout is fully intact.
        assert_eq!(state.bank(PortKind::Output).len(), 3);
        for (idx, conn) in conns.iter().enumerate() {
            assert_eq!(state.bank(PortKind::Output)[idx].connections(), &[*conn]);
        }
        assert!(state.pending_remaps.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (model, count) = dynamic_outputs(1);
        let mut state = NodeState::new(NodeId::new(), &model);

        count.set(3);
        state.reconcile(&model).unwrap();
        let after_first: Vec<PortAddress> = state
            .bank(PortKind::Output)
            .iter()
            .map(|p| p.address())
            .collect();

        state.reconcile(&model).unwrap();
        let after_second: Vec<PortAddress> = state
            .bank(PortKind::Output)
            .iter()
            .map(|p| p.address())
            .collect();

        assert_eq!(after_first, after_second);
        assert!(state.take_endpoint_remaps().is_empty());
    }

    #[test]
    fn test_erase_connection_is_lenient() {
        let (model, _count) = dynamic_outputs(1);
        let mut state = NodeState::new(NodeId::new(), &model);

        // Erasing something never attached is a no-op.
        state
            .erase_connection(&model, PortKind::Output, 0, ConnectionId::new())
            .unwrap();
        state
            .erase_connection(&model, PortKind::Output, 42, ConnectionId::new())
            .unwrap();
    }
}
