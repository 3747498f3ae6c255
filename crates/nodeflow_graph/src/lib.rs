// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection and port topology for an interactive node graph editor.
//!
//! This crate provides the data model and scene geometry that power a
//! dataflow canvas:
//! - Typed input/output ports, reconciled against a node's declared shape
//! - A connection arena with validated attach/detach and endpoint remapping
//! - Drag-to-connect interaction with reaction feedback
//! - Node and spline geometry: port placement, hit testing, bounding rects
//! - Backend-agnostic connection painting
//!
//! ## Architecture
//!
//! Nodes own a [`NodeModel`] (what the node is) next to a [`NodeState`]
//! (what is plugged into it) and a [`NodeGeometry`] (where it is drawn).
//! Port collections are reconciled lazily on every access, so a model may
//! change its port counts at any time; connections live in the
//! [`Graph`]'s arena and ports refer to them by ID.

pub mod connection;
pub mod drag;
pub mod geometry;
pub mod graph;
pub mod models;
pub mod node;
pub mod node_geometry;
pub mod painter;
pub mod port;
pub mod state;
pub mod style;

pub use connection::{Connection, ConnectionId};
pub use drag::{ConnectionDrag, DropOutcome};
pub use geometry::{ConnectionGeometry, SceneTransform};
pub use graph::{Graph, GraphError};
pub use node::{Node, NodeId, NodeModel, ValidationState};
pub use node_geometry::{FixedAdvanceMetrics, NodeGeometry, TextMetrics};
pub use painter::{ConnectionPainter, ConnectionView, DrawCommand, PaintOptions, PathSegment, StrokeStyle};
pub use port::{ConnectionPolicy, DataType, Port, PortAddress, PortKind};
pub use state::{ConnectionReaction, NodeState, PortReindexError};
pub use style::{ConnectionStyle, LayoutDirection, NodeStyle, SplineType, Style};
