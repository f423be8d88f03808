use orthonet_core::{BBox, EdgeId, Point, VertexId};
use serde::{Deserialize, Serialize};

/// Type of integrity violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// An edge references a vertex that does not exist.
    DanglingEndpoint,
    /// Adjacency disagrees with the edge set.
    AsymmetricAdjacency,
    /// Two edges join the same pair of vertices, or an edge loops.
    DuplicateEdge,
    NonOrthogonalEdge,
    CoincidentVertices,
    /// A connected component carries more than one net id, or none.
    InconsistentNet,
    /// A vertex with no edges still carries a net id.
    NetOnIsolatedVertex,
}

/// Severity level of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl ViolationType {
    pub fn severity(&self) -> Severity {
        match self {
            ViolationType::DanglingEndpoint
            | ViolationType::AsymmetricAdjacency
            | ViolationType::DuplicateEdge => Severity::Error,
            ViolationType::NonOrthogonalEdge
            | ViolationType::CoincidentVertices
            | ViolationType::InconsistentNet => Severity::Warning,
            ViolationType::NetOnIsolatedVertex => Severity::Info,
        }
    }
}

/// A single violation with location and the elements involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub message: String,
    /// Region to highlight, when the elements still have positions.
    pub bbox: Option<BBox>,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
}

impl Violation {
    pub fn new(violation_type: ViolationType, message: impl Into<String>) -> Self {
        Self {
            severity: violation_type.severity(),
            violation_type,
            message: message.into(),
            bbox: None,
            vertices: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_vertices(mut self, vertices: impl IntoIterator<Item = VertexId>) -> Self {
        self.vertices.extend(vertices);
        self
    }

    pub fn with_edges(mut self, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn at(mut self, points: &[Point]) -> Self {
        self.bbox = BBox::from_points(points);
        self
    }
}
