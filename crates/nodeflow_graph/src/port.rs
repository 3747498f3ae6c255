// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions: identity, data types and connection membership.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// Input (sink) port
    Input,
    /// Output (source) port
    Output,
}

impl PortKind {
    /// The opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// Data type flowing through a port.
///
/// Compatibility is decided by `id`; `name` is the human-readable label
/// shown next to the port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    /// Stable type identifier used for compatibility checks
    pub id: String,
    /// Display name
    pub name: String,
}

impl DataType {
    /// Create a data type descriptor
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How many connections a port may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPolicy {
    /// At most one connection (typical for inputs)
    One,
    /// Any number of connections (typical for outputs)
    Many,
}

impl ConnectionPolicy {
    /// Whether a port holding `current` connections may accept another
    pub fn allows(self, current: usize) -> bool {
        match self {
            Self::One => current == 0,
            Self::Many => true,
        }
    }
}

/// Identity of a port: node + direction + index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAddress {
    /// Owning node
    pub node: NodeId,
    /// Port direction
    pub kind: PortKind,
    /// Position within the node's ports of that direction
    pub index: usize,
}

impl PortAddress {
    /// Create a port address
    pub fn new(node: NodeId, kind: PortKind, index: usize) -> Self {
        Self { node, kind, index }
    }
}

/// Attempted to connect beyond a port's allowed connection count
#[derive(Debug, Clone, thiserror::Error)]
#[error("Port {address:?} is at capacity ({current} connection(s))")]
pub struct CapacityExceeded {
    /// The full port
    pub address: PortAddress,
    /// Number of connections the port already holds
    pub current: usize,
}

/// A single socket on a node.
///
/// `Port` is a passive container: it records which connections reference it
/// but enforces nothing beyond its capacity. Type compatibility is checked
/// by the drag state machine and [`crate::graph::Graph::connect`].
#[derive(Debug, Clone)]
pub struct Port {
    node: NodeId,
    kind: PortKind,
    index: usize,
    connections: Vec<ConnectionId>,
}

impl Port {
    /// Create an empty port
    pub fn new(node: NodeId, kind: PortKind, index: usize) -> Self {
        Self {
            node,
            kind,
            index,
            connections: Vec::new(),
        }
    }

    /// The identity triple of this port
    pub fn address(&self) -> PortAddress {
        PortAddress::new(self.node, self.kind, self.index)
    }

    /// Port direction
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Port index within its direction
    pub fn index(&self) -> usize {
        self.index
    }

    /// Connections referencing this port, in attachment order
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    /// Register a connection on this port.
    ///
    /// Re-adding an already present connection is a no-op.
    pub fn add_connection(
        &mut self,
        connection: ConnectionId,
        policy: ConnectionPolicy,
    ) -> Result<(), CapacityExceeded> {
        if self.connections.contains(&connection) {
            return Ok(());
        }
        if !policy.allows(self.connections.len()) {
            return Err(CapacityExceeded {
                address: self.address(),
                current: self.connections.len(),
            });
        }
        self.connections.push(connection);
        Ok(())
    }

    /// Remove a connection from this port; no-op if not present
    pub fn remove_connection(&mut self, connection: ConnectionId) {
        self.connections.retain(|c| *c != connection);
    }

    /// Register a connection without a capacity check.
    ///
    /// Used when reattaching gathered connections during re-indexing, where
    /// capacity was already satisfied by the old layout.
    pub(crate) fn push_connection(&mut self, connection: ConnectionId) {
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
        }
    }
}
