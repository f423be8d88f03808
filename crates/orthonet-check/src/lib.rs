//! # OrthoNet Check
//!
//! Integrity checks over a wire graph: referential consistency of edges and
//! adjacency, orthogonality, leftover coincident vertices and net identity.
//! A normalized, net-reconciled graph produces no violations.

pub mod violation;

use std::collections::{BTreeSet, HashMap, HashSet};

use orthonet_core::geometry::axis_between;
use orthonet_core::nets;
use orthonet_core::spatial::VertexIndex;
use orthonet_core::{GeometryPolicy, GraphState, VertexId};

pub use violation::{Severity, Violation, ViolationType};

/// Run every check and return the violations, most severe first.
pub fn check_graph(state: &GraphState, policy: &GeometryPolicy) -> Vec<Violation> {
    let mut out = Vec::new();
    check_edges(state, &mut out);
    check_adjacency(state, &mut out);
    check_orthogonality(state, policy, &mut out);
    check_coincidence(state, policy, &mut out);
    check_nets(state, &mut out);
    out.sort_by_key(|v| v.severity);
    log::debug!("integrity check: {} violations", out.len());
    out
}

pub fn has_errors(violations: &[Violation]) -> bool {
    violations.iter().any(|v| v.severity == Severity::Error)
}

fn check_edges(state: &GraphState, out: &mut Vec<Violation>) {
    let mut pairs: HashMap<(VertexId, VertexId), orthonet_core::EdgeId> = HashMap::new();
    for id in state.sorted_edge_ids() {
        let Some(edge) = state.edge(id) else {
            continue;
        };
        for v in [edge.a, edge.b] {
            if !state.contains_vertex(v) {
                out.push(
                    Violation::new(
                        ViolationType::DanglingEndpoint,
                        format!("edge {id} references missing vertex {v}"),
                    )
                    .with_edges([id])
                    .with_vertices([v]),
                );
            }
        }
        if edge.a == edge.b {
            out.push(
                Violation::new(ViolationType::DuplicateEdge, format!("edge {id} loops on {}", edge.a))
                    .with_edges([id]),
            );
            continue;
        }
        let key = (edge.a.min(edge.b), edge.a.max(edge.b));
        if let Some(first) = pairs.insert(key, id) {
            out.push(
                Violation::new(
                    ViolationType::DuplicateEdge,
                    format!("edges {first} and {id} join the same vertices"),
                )
                .with_edges([first, id])
                .with_vertices([key.0, key.1]),
            );
        }
    }
}

fn check_adjacency(state: &GraphState, out: &mut Vec<Violation>) {
    for id in state.sorted_edge_ids() {
        let Some(edge) = state.edge(id) else {
            continue;
        };
        for v in [edge.a, edge.b] {
            let listed = state.adjacency().get(&v).is_some_and(|set| set.contains(&id));
            if !listed {
                out.push(
                    Violation::new(
                        ViolationType::AsymmetricAdjacency,
                        format!("edge {id} missing from adjacency of {v}"),
                    )
                    .with_edges([id])
                    .with_vertices([v]),
                );
            }
        }
    }

    let mut listed: Vec<_> = state.adjacency().iter().collect();
    listed.sort_by_key(|(v, _)| **v);
    for (v, incident) in listed {
        if !state.contains_vertex(*v) {
            out.push(
                Violation::new(
                    ViolationType::AsymmetricAdjacency,
                    format!("adjacency entry for missing vertex {v}"),
                )
                .with_vertices([*v]),
            );
        }
        let mut stray: Vec<_> = incident
            .iter()
            .filter(|e| !state.edge(**e).is_some_and(|edge| edge.touches(*v)))
            .copied()
            .collect();
        stray.sort_unstable();
        if !stray.is_empty() {
            out.push(
                Violation::new(
                    ViolationType::AsymmetricAdjacency,
                    format!("vertex {v} lists {} edges that do not touch it", stray.len()),
                )
                .with_vertices([*v])
                .with_edges(stray),
            );
        }
    }
    for v in state.sorted_vertex_ids() {
        if !state.adjacency().contains_key(&v) {
            out.push(
                Violation::new(
                    ViolationType::AsymmetricAdjacency,
                    format!("vertex {v} has no adjacency entry"),
                )
                .with_vertices([v]),
            );
        }
    }
}

fn is_placed(state: &GraphState, v: VertexId) -> bool {
    state.vertex(v).is_some_and(|x| x.placed)
}

fn check_orthogonality(state: &GraphState, policy: &GeometryPolicy, out: &mut Vec<Violation>) {
    for id in state.sorted_edge_ids() {
        let Some(edge) = state.edge(id) else {
            continue;
        };
        if !is_placed(state, edge.a) || !is_placed(state, edge.b) {
            continue;
        }
        let Some((pa, pb)) = state.edge_points(id) else {
            continue;
        };
        if axis_between(&pa, &pb, policy.epsilon).is_none() {
            out.push(
                Violation::new(
                    ViolationType::NonOrthogonalEdge,
                    format!("edge {id} runs ({}, {}) -> ({}, {})", pa.x, pa.y, pb.x, pb.y),
                )
                .with_edges([id])
                .with_vertices([edge.a, edge.b])
                .at(&[pa, pb]),
            );
        }
    }
}

fn check_coincidence(state: &GraphState, policy: &GeometryPolicy, out: &mut Vec<Violation>) {
    let index = VertexIndex::build(state);
    let mut reported: BTreeSet<(VertexId, VertexId)> = BTreeSet::new();
    for v in state.sorted_vertex_ids() {
        let Some(vertex) = state.vertex(v).filter(|x| x.placed) else {
            continue;
        };
        for other in index.query_near(&vertex.point, policy.epsilon) {
            if other <= v {
                continue;
            }
            let both_pins = state.vertex(other).is_some_and(|o| o.ownership.is_pin())
                && vertex.ownership.is_pin();
            if both_pins {
                continue;
            }
            reported.insert((v, other));
        }
    }
    for (a, b) in reported {
        let points: Vec<_> = [a, b].iter().filter_map(|v| state.point(*v)).collect();
        out.push(
            Violation::new(
                ViolationType::CoincidentVertices,
                format!("vertices {a} and {b} share a point"),
            )
            .with_vertices([a, b])
            .at(&points),
        );
    }
}

fn check_nets(state: &GraphState, out: &mut Vec<Violation>) {
    for comp in nets::components(state) {
        let ids: HashSet<_> = comp
            .vertices
            .iter()
            .map(|v| state.vertex(*v).and_then(|x| x.net))
            .collect();
        if comp.edges.is_empty() {
            for v in &comp.vertices {
                if let Some(net) = state.vertex(*v).and_then(|x| x.net) {
                    out.push(
                        Violation::new(
                            ViolationType::NetOnIsolatedVertex,
                            format!("isolated vertex {v} still carries net {net}"),
                        )
                        .with_vertices([*v]),
                    );
                }
            }
            continue;
        }
        if ids.len() != 1 || ids.contains(&None) {
            out.push(
                Violation::new(
                    ViolationType::InconsistentNet,
                    format!(
                        "component of {} vertices carries {} distinct net ids",
                        comp.vertices.len(),
                        ids.len()
                    ),
                )
                .with_vertices(comp.vertices.iter().copied())
                .with_edges(comp.edges.iter().copied()),
            );
        }
    }
}
