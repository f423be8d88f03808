//! # OrthoNet Core
//!
//! Planar orthogonal connectivity graph for schematic wires and layout
//! traces: a vertex/edge store kept in canonical form by normalization,
//! persistent net identity across splits and merges, L-shaped routing and
//! an interactive drag state machine that keeps every segment horizontal or
//! vertical.
//!
//! [`WireEngine`] is the entry point. Each committed edit returns a
//! [`ChangeSet`] describing what changed.

pub mod commands;
pub mod config;
pub mod delta;
pub mod drag;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod nets;
pub mod normalize;
pub mod persist;
pub mod pins;
pub mod routing;
pub mod spatial;

pub use config::{EngineConfig, GeometryPolicy};
pub use delta::ChangeSet;
pub use drag::{DragPhase, DragSelection, DragSession};
pub use engine::WireEngine;
pub use error::EngineError;
pub use geometry::{Axis, BBox, Point};
pub use graph::{Edge, EdgeId, GraphState, NetId, OwnerId, Ownership, PinId, Vertex, VertexId};
pub use persist::{AttachmentPoint, PersistedWire, WireSegment};
pub use pins::{PinDefinition, Transform};
pub use routing::RouteStrategy;
