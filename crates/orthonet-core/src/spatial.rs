use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point};
use crate::graph::{GraphState, VertexId};

/// An entry in the R-tree spatial index, referencing a vertex by id.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    pub vertex_id: VertexId,
    pub point: Point,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.x, self.point.y])
    }
}

/// Point index over placed vertices, for coincidence search and viewport culling.
///
/// Built on demand from a snapshot; it does not follow later mutations.
pub struct VertexIndex {
    tree: RTree<SpatialEntry>,
}

impl VertexIndex {
    pub fn build(state: &GraphState) -> Self {
        let entries = state
            .vertices()
            .values()
            .filter(|v| v.placed)
            .map(|v| SpatialEntry {
                vertex_id: v.id,
                point: v.point,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Vertices within `eps` of `point` on both axes.
    pub fn query_near(&self, point: &Point, eps: f64) -> Vec<VertexId> {
        let envelope = AABB::from_corners(
            [point.x - eps, point.y - eps],
            [point.x + eps, point.y + eps],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.vertex_id)
            .collect()
    }

    /// Vertices inside the given viewport bounding box.
    pub fn query_bbox(&self, viewport: &BBox) -> Vec<VertexId> {
        let envelope = AABB::from_corners(
            [viewport.min.x, viewport.min.y],
            [viewport.max.x, viewport.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.vertex_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Ownership;

    #[test]
    fn test_spatial_query() {
        let mut g = GraphState::new();
        let a = g.add_vertex(Point::new(0.0, 0.0), Ownership::Free);
        let b = g.add_vertex(Point::new(25.0, 25.0), Ownership::Free);
        let unplaced = g.add_vertex(Point::new(0.0, 0.0), Ownership::Free);
        if let Some(v) = g.vertex_mut(unplaced) {
            v.placed = false;
        }
        let index = VertexIndex::build(&g);

        assert_eq!(index.query_near(&Point::new(0.0000001, 0.0), 1e-6), vec![a]);
        assert!(index.query_near(&Point::new(1.0, 0.0), 1e-6).is_empty());

        let viewport = BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        assert_eq!(index.query_bbox(&viewport), vec![b]);
    }
}
