//! Canonical-form restoration after structural edits.
//!
//! Every pass runs, in order: coincident merge, re-split at pass-through
//! vertices, collinear-run collapse, orphan cleanup. Merge can create new
//! overlaps, and collapse needs correct junction degrees, so the order is
//! fixed. Passes repeat until one changes nothing or the configured pass
//! budget runs out.

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::geometry::{axis_between, is_strictly_inside_segment, Axis, BBox};
use crate::graph::{GraphState, Ownership, VertexId};
use crate::nets;
use crate::spatial::VertexIndex;

/// What a normalization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub passes: usize,
    pub merged_vertices: usize,
    pub split_edges: usize,
    pub collapsed_vertices: usize,
    pub removed_orphans: usize,
    /// False if the pass budget ran out before a pass made no change.
    pub converged: bool,
}

impl NormalizeReport {
    pub fn changed(&self) -> bool {
        self.merged_vertices + self.split_edges + self.collapsed_vertices + self.removed_orphans > 0
    }
}

/// Normalize the region around `touched`.
pub fn normalize(
    state: &mut GraphState,
    touched: &HashSet<VertexId>,
    config: &EngineConfig,
) -> NormalizeReport {
    let eps = config.geometry.epsilon;
    let mut scope: HashSet<VertexId> = touched
        .iter()
        .copied()
        .filter(|v| state.contains_vertex(*v))
        .collect();
    let mut report = NormalizeReport::default();

    for pass in 1..=config.max_normalize_passes.max(1) {
        report.passes = pass;
        let merged = merge_coincident(state, &mut scope, eps);
        let split = resplit_edges(state, &mut scope, eps);
        let collapsed = collapse_collinear_runs(state, &mut scope, eps);
        let orphans = remove_orphans(state, &mut scope);
        scope.retain(|v| state.contains_vertex(*v));

        report.merged_vertices += merged;
        report.split_edges += split;
        report.collapsed_vertices += collapsed;
        report.removed_orphans += orphans;

        log::debug!(
            "normalize pass {pass}: merged={merged} split={split} collapsed={collapsed} orphans={orphans}"
        );
        if merged + split + collapsed + orphans == 0 {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        log::warn!(
            "normalization did not reach a fixed point after {} passes",
            report.passes
        );
    }
    report
}

/// Normalize the whole graph.
pub fn normalize_all(state: &mut GraphState, config: &EngineConfig) -> NormalizeReport {
    let all: HashSet<VertexId> = state.vertices().keys().copied().collect();
    normalize(state, &all, config)
}

fn sorted(scope: &HashSet<VertexId>) -> Vec<VertexId> {
    let mut ids: Vec<VertexId> = scope.iter().copied().collect();
    ids.sort_unstable();
    ids
}

// ── 1. Coincident merge ──────────────────────────────────────────────

fn merge_coincident(state: &mut GraphState, scope: &mut HashSet<VertexId>, eps: f64) -> usize {
    let index = VertexIndex::build(state);
    let mut removed: HashSet<VertexId> = HashSet::new();
    let mut merged = 0;

    for v in sorted(scope) {
        if removed.contains(&v) {
            continue;
        }
        let Some(point) = state.vertex(v).filter(|vx| vx.placed).map(|vx| vx.point) else {
            continue;
        };
        let mut group: Vec<VertexId> = index
            .query_near(&point, eps)
            .into_iter()
            .filter(|id| !removed.contains(id))
            .filter(|id| {
                state
                    .vertex(*id)
                    .map_or(false, |o| o.placed && o.point.approx_eq(&point, eps))
            })
            .collect();
        if group.len() < 2 {
            continue;
        }
        group.sort_unstable();

        // Highest rank wins, then the smallest id.
        let survivor = group.iter().copied().max_by(|a, b| {
            let ra = state.vertex(*a).map_or(0, |x| x.ownership.merge_rank());
            let rb = state.vertex(*b).map_or(0, |x| x.ownership.merge_rank());
            ra.cmp(&rb).then(b.cmp(a))
        });
        let Some(survivor) = survivor else {
            continue;
        };

        for victim in group {
            if victim == survivor {
                continue;
            }
            // Distinct pins are never merged into each other.
            if state.vertex(victim).map_or(true, |x| x.ownership.is_pin()) {
                continue;
            }
            merge_into(state, survivor, victim, scope);
            removed.insert(victim);
            merged += 1;
        }
    }
    merged
}

fn merge_into(
    state: &mut GraphState,
    survivor: VertexId,
    victim: VertexId,
    scope: &mut HashSet<VertexId>,
) {
    let victim_net = state.vertex(victim).and_then(|v| v.net);
    for edge_id in state.incident_edges(victim) {
        let Some(edge) = state.remove_edge(edge_id) else {
            continue;
        };
        let other = edge.other(victim);
        if other != survivor {
            state.add_edge(survivor, other);
            scope.insert(other);
        }
    }
    state.remove_vertex(victim);
    scope.remove(&victim);
    scope.insert(survivor);

    let survivor_net = state.vertex(survivor).and_then(|v| v.net);
    match (survivor_net, victim_net) {
        (Some(keep), Some(absorb)) if keep != absorb => nets::absorb_net(state, keep, absorb),
        (None, Some(net)) => {
            state.set_net(survivor, Some(net));
            nets::unify(state, survivor, survivor);
        }
        _ => {}
    }
}

// ── 2. Re-split at pass-through vertices ─────────────────────────────

fn resplit_edges(state: &mut GraphState, scope: &mut HashSet<VertexId>, eps: f64) -> usize {
    // Splitting rewires edges but never moves a vertex, so one index serves the pass.
    let index = VertexIndex::build(state);
    let mut splits = 0;
    for edge_id in state.sorted_edge_ids() {
        let Some(edge) = state.edge(edge_id).copied() else {
            continue;
        };
        let (Some(a), Some(b)) = (state.vertex(edge.a), state.vertex(edge.b)) else {
            continue;
        };
        if !a.placed || !b.placed {
            continue;
        }
        let (pa, pb) = (a.point, b.point);
        let edge_in_scope = scope.contains(&edge.a) || scope.contains(&edge.b);
        let bbox = BBox::of_segment(pa, pb).expanded(eps);

        let mut inside: Vec<(f64, VertexId)> = index
            .query_bbox(&bbox)
            .into_iter()
            .filter(|id| *id != edge.a && *id != edge.b)
            .filter(|id| edge_in_scope || scope.contains(id))
            .filter_map(|id| state.vertex(id))
            .filter(|v| is_strictly_inside_segment(&v.point, &pa, &pb, eps))
            .map(|v| (v.point.distance_to(&pa), v.id))
            .collect();
        if inside.is_empty() {
            continue;
        }
        inside.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

        state.remove_edge(edge_id);
        let mut prev = edge.a;
        for (_, v) in &inside {
            state.add_edge(prev, *v);
            scope.insert(*v);
            prev = *v;
        }
        state.add_edge(prev, edge.b);
        scope.insert(edge.a);
        scope.insert(edge.b);
        // The pass-through vertices now belong to this wire's net.
        nets::unify(state, edge.a, inside[0].1);
        splits += 1;
    }
    splits
}

// ── 3. Collinear-run collapse ────────────────────────────────────────

/// Neighbours of `v` joined to it by an edge along `axis`.
fn axis_neighbors(state: &GraphState, v: VertexId, axis: Axis, eps: f64) -> Vec<VertexId> {
    let Some(p) = state.point(v) else {
        return Vec::new();
    };
    state
        .neighbors(v)
        .into_iter()
        .filter(|w| {
            state
                .point(*w)
                .map_or(false, |q| axis_between(&p, &q, eps) == Some(axis))
        })
        .collect()
}

/// A free vertex whose only two edges both run along `axis`. Such vertices
/// are redundant waypoints; everything else (pins, junctions, corners, wire
/// ends) is kept.
fn is_passable(state: &GraphState, v: VertexId, axis: Axis, eps: f64) -> bool {
    let Some(vertex) = state.vertex(v) else {
        return false;
    };
    match vertex.ownership {
        Ownership::Free => {}
        Ownership::PinOwned { .. } | Ownership::DetachedPin => return false,
    }
    vertex.placed && state.degree(v) == 2 && axis_neighbors(state, v, axis, eps).len() == 2
}

/// Walk from `prev` through `cur` while vertices are passable.
fn walk(
    state: &GraphState,
    mut prev: VertexId,
    mut cur: VertexId,
    axis: Axis,
    eps: f64,
    in_run: &mut HashSet<VertexId>,
) -> Vec<VertexId> {
    let mut out = Vec::new();
    loop {
        if !in_run.insert(cur) {
            break;
        }
        out.push(cur);
        if !is_passable(state, cur, axis, eps) {
            break;
        }
        let next = axis_neighbors(state, cur, axis, eps)
            .into_iter()
            .find(|w| *w != prev);
        match next {
            Some(next) => {
                prev = cur;
                cur = next;
            }
            None => break,
        }
    }
    out
}

/// Maximal straight runs through `v` along `axis`, ordered end to end.
fn collinear_runs(state: &GraphState, v: VertexId, axis: Axis, eps: f64) -> Vec<Vec<VertexId>> {
    let nbs = axis_neighbors(state, v, axis, eps);
    if nbs.is_empty() {
        return Vec::new();
    }
    if is_passable(state, v, axis, eps) {
        let mut in_run: HashSet<VertexId> = HashSet::from([v]);
        let mut left = walk(state, v, nbs[0], axis, eps, &mut in_run);
        let right = walk(state, v, nbs[1], axis, eps, &mut in_run);
        left.reverse();
        left.push(v);
        left.extend(right);
        return vec![left];
    }
    nbs.iter()
        .map(|nb| {
            let mut in_run: HashSet<VertexId> = HashSet::from([v]);
            let mut run = vec![v];
            run.extend(walk(state, v, *nb, axis, eps, &mut in_run));
            run
        })
        .collect()
}

fn collapse_collinear_runs(state: &mut GraphState, scope: &mut HashSet<VertexId>, eps: f64) -> usize {
    let mut removed = 0;
    for v in sorted(scope) {
        for axis in Axis::BOTH {
            if !state.contains_vertex(v) {
                break;
            }
            for run in collinear_runs(state, v, axis, eps) {
                if run.len() < 3 {
                    continue;
                }
                let first = run[0];
                let last = run[run.len() - 1];
                for interior in &run[1..run.len() - 1] {
                    state.remove_vertex(*interior);
                    scope.remove(interior);
                    removed += 1;
                }
                state.add_edge(first, last);
                scope.insert(first);
                scope.insert(last);
            }
        }
    }
    removed
}

// ── 4. Orphan cleanup ────────────────────────────────────────────────

fn remove_orphans(state: &mut GraphState, scope: &mut HashSet<VertexId>) -> usize {
    let mut removed = 0;
    for v in sorted(scope) {
        let orphan = state
            .vertex(v)
            .map_or(false, |x| x.ownership == Ownership::Free && state.degree(v) == 0);
        if orphan {
            state.remove_vertex(v);
            scope.remove(&v);
            removed += 1;
        }
    }
    removed
}
