use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::{EdgeId, GraphState, NetId, VertexId};

/// A vertex whose net identifier changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetReassignment {
    pub vertex: VertexId,
    pub from: Option<NetId>,
    pub to: Option<NetId>,
}

/// Everything a committed operation changed, for renderers and dirty
/// tracking. All id lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub created_vertices: Vec<VertexId>,
    pub deleted_vertices: Vec<VertexId>,
    pub moved_vertices: Vec<VertexId>,
    /// Vertices whose ownership changed, such as released or detached pins.
    pub reowned_vertices: Vec<VertexId>,
    pub created_edges: Vec<EdgeId>,
    pub deleted_edges: Vec<EdgeId>,
    pub net_reassignments: Vec<NetReassignment>,
    /// Net display names that appeared, vanished or changed.
    pub renamed_nets: Vec<NetId>,
}

impl ChangeSet {
    /// Compare two snapshots of the same graph.
    pub fn diff(before: &GraphState, after: &GraphState) -> Self {
        let mut cs = ChangeSet::default();

        for id in after.sorted_vertex_ids() {
            let Some(new) = after.vertex(id) else {
                continue;
            };
            match before.vertex(id) {
                None => cs.created_vertices.push(id),
                Some(old) => {
                    if old.point != new.point || old.placed != new.placed {
                        cs.moved_vertices.push(id);
                    }
                    if old.ownership != new.ownership {
                        cs.reowned_vertices.push(id);
                    }
                    if old.net != new.net {
                        cs.net_reassignments.push(NetReassignment {
                            vertex: id,
                            from: old.net,
                            to: new.net,
                        });
                    }
                }
            }
        }
        cs.deleted_vertices = before
            .sorted_vertex_ids()
            .into_iter()
            .filter(|id| !after.contains_vertex(*id))
            .collect();

        // Endpoint rewiring keeps no edge id, so presence is the whole story.
        cs.created_edges = after
            .sorted_edge_ids()
            .into_iter()
            .filter(|id| before.edge(*id).is_none())
            .collect();
        cs.deleted_edges = before
            .sorted_edge_ids()
            .into_iter()
            .filter(|id| after.edge(*id).is_none())
            .collect();

        let nets: HashSet<NetId> = before
            .net_names()
            .keys()
            .chain(after.net_names().keys())
            .copied()
            .collect();
        let mut renamed: Vec<NetId> = nets
            .into_iter()
            .filter(|n| before.net_name(*n) != after.net_name(*n))
            .collect();
        renamed.sort_unstable();
        cs.renamed_nets = renamed;
        cs
    }

    pub fn is_empty(&self) -> bool {
        self.created_vertices.is_empty()
            && self.deleted_vertices.is_empty()
            && self.moved_vertices.is_empty()
            && self.reowned_vertices.is_empty()
            && self.created_edges.is_empty()
            && self.deleted_edges.is_empty()
            && self.net_reassignments.is_empty()
            && self.renamed_nets.is_empty()
    }

    /// Vertices a renderer has to redraw.
    pub fn affected_vertices(&self) -> HashSet<VertexId> {
        self.created_vertices
            .iter()
            .chain(&self.deleted_vertices)
            .chain(&self.moved_vertices)
            .chain(&self.reowned_vertices)
            .copied()
            .chain(self.net_reassignments.iter().map(|r| r.vertex))
            .collect()
    }
}
