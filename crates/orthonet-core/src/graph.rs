use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{distance_to_segment, is_point_on_segment, BBox, Point};
use crate::spatial::VertexIndex;

/// Identifier of the symbol or footprint that owns a pin.
pub type OwnerId = Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique vertex identifier.
    VertexId
);
uuid_id!(
    /// Unique edge identifier.
    EdgeId
);
uuid_id!(
    /// Persistent net identifier carried by every vertex of a connected component.
    NetId
);

/// Name of a pin within its owner's definition (e.g. `"1"`, `"VCC"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub String);

impl PinId {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who controls a vertex's position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    Free,
    PinOwned { owner: OwnerId, pin: PinId },
    /// A pin vertex split off its anchor while a drag is in progress.
    DetachedPin,
}

impl Ownership {
    pub fn is_pin(&self) -> bool {
        matches!(self, Ownership::PinOwned { .. })
    }

    /// Survivorship rank during coincident merge; higher wins.
    pub(crate) fn merge_rank(&self) -> u8 {
        match self {
            Ownership::PinOwned { .. } => 2,
            Ownership::DetachedPin => 1,
            Ownership::Free => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub point: Point,
    pub ownership: Ownership,
    pub net: Option<NetId>,
    /// False for pin vertices still sitting at their ingest placeholder.
    pub placed: bool,
}

/// Undirected edge; its segment is implied by the endpoints' points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub a: VertexId,
    pub b: VertexId,
}

impl Edge {
    /// The endpoint opposite `v`.
    pub fn other(&self, v: VertexId) -> VertexId {
        if self.a == v {
            self.b
        } else {
            self.a
        }
    }

    pub fn touches(&self, v: VertexId) -> bool {
        self.a == v || self.b == v
    }
}

/// Display name of a net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetName {
    pub name: String,
    /// Set when the user typed the name; auto names lose to these on merge.
    pub user_assigned: bool,
}

/// The vertex/edge/adjacency store.
///
/// Cloning yields an independent working copy; the engine publishes states
/// behind an `Arc` and swaps it on commit.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    vertices: HashMap<VertexId, Vertex>,
    edges: HashMap<EdgeId, Edge>,
    adjacency: HashMap<VertexId, HashSet<EdgeId>>,
    pub(crate) net_names: HashMap<NetId, NetName>,
    /// Last number handed out for an auto-generated `N$<n>` name.
    pub(crate) net_counter: u32,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Vertices ─────────────────────────────────────────────────────

    pub fn add_vertex(&mut self, point: Point, ownership: Ownership) -> VertexId {
        let id = VertexId::new();
        self.insert_vertex(id, point, ownership);
        id
    }

    /// Add a vertex under a caller-chosen id, replacing nothing if the id is
    /// already taken.
    pub(crate) fn insert_vertex(&mut self, id: VertexId, point: Point, ownership: Ownership) -> bool {
        if self.vertices.contains_key(&id) {
            return false;
        }
        self.vertices.insert(
            id,
            Vertex {
                id,
                point,
                ownership,
                net: None,
                placed: true,
            },
        );
        self.adjacency.insert(id, HashSet::new());
        true
    }

    /// Remove a vertex and every incident edge. No-op for unknown ids.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<Vertex> {
        let incident: Vec<EdgeId> = self
            .adjacency
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        for edge_id in incident {
            self.remove_edge(edge_id);
        }
        self.adjacency.remove(&id);
        self.vertices.remove(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub(crate) fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(&id)
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn point(&self, id: VertexId) -> Option<Point> {
        self.vertices.get(&id).map(|v| v.point)
    }

    pub fn move_vertex(&mut self, id: VertexId, point: Point) -> bool {
        match self.vertices.get_mut(&id) {
            Some(v) => {
                v.point = point;
                true
            }
            None => false,
        }
    }

    pub fn set_ownership(&mut self, id: VertexId, ownership: Ownership) -> bool {
        match self.vertices.get_mut(&id) {
            Some(v) => {
                v.ownership = ownership;
                true
            }
            None => false,
        }
    }

    pub fn vertices(&self) -> &HashMap<VertexId, Vertex> {
        &self.vertices
    }

    /// Vertex ids in a stable order, for deterministic iteration.
    pub fn sorted_vertex_ids(&self) -> Vec<VertexId> {
        let mut ids: Vec<VertexId> = self.vertices.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // ── Edges ────────────────────────────────────────────────────────

    /// Connect `a` and `b`. Returns `None` if an endpoint is missing, the
    /// edge would be a self-loop, or the pair is already connected.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        if a == b || !self.vertices.contains_key(&a) || !self.vertices.contains_key(&b) {
            return None;
        }
        if self.edge_between(a, b).is_some() {
            return None;
        }
        let id = EdgeId::new();
        self.edges.insert(id, Edge { id, a, b });
        self.adjacency.entry(a).or_default().insert(id);
        self.adjacency.entry(b).or_default().insert(id);
        Some(id)
    }

    /// Detach an edge from both endpoints. No-op for unknown ids.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        for end in [edge.a, edge.b] {
            if let Some(set) = self.adjacency.get_mut(&end) {
                set.remove(&id);
            }
        }
        Some(edge)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn edges(&self) -> &HashMap<EdgeId, Edge> {
        &self.edges
    }

    pub fn sorted_edge_ids(&self) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self.edges.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let set = self.adjacency.get(&a)?;
        set.iter()
            .copied()
            .find(|e| self.edges.get(e).map_or(false, |edge| edge.touches(b)))
    }

    /// Endpoint points of an edge.
    pub fn edge_points(&self, id: EdgeId) -> Option<(Point, Point)> {
        let edge = self.edges.get(&id)?;
        Some((self.point(edge.a)?, self.point(edge.b)?))
    }

    // ── Adjacency ────────────────────────────────────────────────────

    pub fn adjacency(&self) -> &HashMap<VertexId, HashSet<EdgeId>> {
        &self.adjacency
    }

    pub fn incident_edges(&self, v: VertexId) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .adjacency
            .get(&v)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Neighbour vertex ids in a stable order.
    pub fn neighbors(&self, v: VertexId) -> Vec<VertexId> {
        let mut out: Vec<VertexId> = self
            .adjacency
            .get(&v)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edges.get(e).map(|edge| edge.other(v)))
            .collect();
        out.sort_unstable();
        out
    }

    pub fn degree(&self, v: VertexId) -> usize {
        self.adjacency.get(&v).map_or(0, |set| set.len())
    }

    // ── Hit-testing ──────────────────────────────────────────────────

    /// Closest placed vertex within `tolerance` of `point`.
    pub fn find_vertex_at(&self, point: Point, tolerance: f64) -> Option<VertexId> {
        self.vertices
            .values()
            .filter(|v| v.placed)
            .map(|v| (v.id, v.point.distance_to(&point)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|(ia, da), (ib, db)| da.total_cmp(db).then(ia.cmp(ib)))
            .map(|(id, _)| id)
    }

    /// Closest edge whose segment passes within `tolerance` of `point`.
    pub fn find_edge_at(&self, point: Point, tolerance: f64) -> Option<EdgeId> {
        self.edges
            .values()
            .filter_map(|edge| {
                let a = self.vertices.get(&edge.a)?;
                let b = self.vertices.get(&edge.b)?;
                if !a.placed || !b.placed {
                    return None;
                }
                if !is_point_on_segment(&point, &a.point, &b.point, tolerance) {
                    return None;
                }
                Some((edge.id, distance_to_segment(&point, &a.point, &b.point)))
            })
            .min_by(|(ia, da), (ib, db)| da.total_cmp(db).then(ia.cmp(ib)))
            .map(|(id, _)| id)
    }

    /// Placed vertices inside `viewport`, for render culling.
    pub fn vertices_in(&self, viewport: &BBox) -> Vec<VertexId> {
        let index = VertexIndex::build(self);
        let mut ids = index.query_bbox(viewport);
        ids.sort_unstable();
        ids
    }

    // ── Nets ─────────────────────────────────────────────────────────

    pub fn net_name(&self, net: NetId) -> Option<&NetName> {
        self.net_names.get(&net)
    }

    pub fn net_names(&self) -> &HashMap<NetId, NetName> {
        &self.net_names
    }

    pub(crate) fn set_net(&mut self, v: VertexId, net: Option<NetId>) {
        if let Some(vertex) = self.vertices.get_mut(&v) {
            vertex.net = net;
        }
    }

    /// Pin vertices of `owner`.
    pub fn pins_of(&self, owner: OwnerId) -> Vec<VertexId> {
        let mut ids: Vec<VertexId> = self
            .vertices
            .values()
            .filter(|v| matches!(&v.ownership, Ownership::PinOwned { owner: o, .. } if *o == owner))
            .map(|v| v.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
