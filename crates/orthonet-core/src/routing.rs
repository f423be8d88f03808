//! Orthogonal path synthesis between two vertices.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::GeometryPolicy;
use crate::error::EngineError;
use crate::geometry::{axis_between, is_strictly_inside_segment, Axis, Point};
use crate::graph::{EdgeId, GraphState, Ownership, VertexId};
use crate::nets;

/// Which leg of an L-shaped route comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteStrategy {
    #[default]
    HorizontalThenVertical,
    VerticalThenHorizontal,
}

impl RouteStrategy {
    /// The right-angle corner between `start` and `end`.
    pub fn corner(self, start: Point, end: Point) -> Point {
        match self {
            RouteStrategy::HorizontalThenVertical => Point::new(end.x, start.y),
            RouteStrategy::VerticalThenHorizontal => Point::new(start.x, end.y),
        }
    }
}

/// Wire `start` to `end` with a straight or L-shaped path.
///
/// Only the structure is built here; the caller normalizes the returned
/// touched set.
pub fn connect(
    state: &mut GraphState,
    start: VertexId,
    end: VertexId,
    strategy: RouteStrategy,
    policy: &GeometryPolicy,
) -> Result<HashSet<VertexId>, EngineError> {
    if start == end {
        return Err(EngineError::SelfConnection(start));
    }
    let ps = state.point(start).ok_or(EngineError::UnknownVertex(start))?;
    let pe = state.point(end).ok_or(EngineError::UnknownVertex(end))?;
    let eps = policy.epsilon;

    let mut touched = HashSet::from([start, end]);
    if ps.approx_eq(&pe, eps) {
        // Coincident endpoints are joined by the merge step.
        return Ok(touched);
    }

    if axis_between(&ps, &pe, eps).is_some() {
        straight_run(state, start, end, eps, &mut touched);
    } else {
        let corner = vertex_at_or_split(state, strategy.corner(ps, pe), eps, &mut touched);
        straight_run(state, start, corner, eps, &mut touched);
        straight_run(state, corner, end, eps, &mut touched);
    }

    nets::unify(state, start, end);
    log::debug!("connected {start} -> {end} ({strategy:?}), {} vertices touched", touched.len());
    Ok(touched)
}

/// Resolve both endpoints from sheet points, then [`connect`] them.
pub fn connect_points(
    state: &mut GraphState,
    from: Point,
    to: Point,
    strategy: RouteStrategy,
    policy: &GeometryPolicy,
) -> Result<HashSet<VertexId>, EngineError> {
    let eps = policy.epsilon;
    let mut touched = HashSet::new();
    let start = vertex_at_or_split(state, policy.snap(from), eps, &mut touched);
    let end = vertex_at_or_split(state, policy.snap(to), eps, &mut touched);
    let mut more = connect(state, start, end, strategy, policy)?;
    more.extend(touched);
    Ok(more)
}

/// Existing vertex at `point`, else a new vertex splitting the edge under
/// `point`, else a new isolated vertex.
pub fn vertex_at_or_split(
    state: &mut GraphState,
    point: Point,
    eps: f64,
    touched: &mut HashSet<VertexId>,
) -> VertexId {
    if let Some(v) = state.find_vertex_at(point, eps) {
        touched.insert(v);
        return v;
    }
    if let Some(edge) = state.find_edge_at(point, eps) {
        if let Some(v) = split_edge_at(state, edge, point) {
            touched.insert(v);
            return v;
        }
    }
    let v = state.add_vertex(point, Ownership::Free);
    touched.insert(v);
    v
}

/// Replace `edge` by two edges through a new free vertex at `point`.
pub fn split_edge_at(state: &mut GraphState, edge: EdgeId, point: Point) -> Option<VertexId> {
    let removed = state.remove_edge(edge)?;
    let net = state.vertex(removed.a).and_then(|v| v.net);
    let v = state.add_vertex(point, Ownership::Free);
    state.set_net(v, net);
    state.add_edge(removed.a, v);
    state.add_edge(v, removed.b);
    Some(v)
}

/// Chain `from` to `to` through every vertex on the segment between them,
/// splitting perpendicular edges the segment crosses.
fn straight_run(
    state: &mut GraphState,
    from: VertexId,
    to: VertexId,
    eps: f64,
    touched: &mut HashSet<VertexId>,
) {
    let (Some(pf), Some(pt)) = (state.point(from), state.point(to)) else {
        return;
    };
    if from == to {
        return;
    }
    split_crossings(state, pf, pt, eps, touched);

    let mut on_run: Vec<(f64, VertexId)> = state
        .vertices()
        .values()
        .filter(|v| v.placed && v.id != from && v.id != to)
        .filter(|v| is_strictly_inside_segment(&v.point, &pf, &pt, eps))
        .map(|v| (v.point.distance_to(&pf), v.id))
        .collect();
    on_run.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

    let mut prev = from;
    for (_, v) in on_run {
        state.add_edge(prev, v);
        touched.insert(v);
        prev = v;
    }
    state.add_edge(prev, to);
}

/// Insert a vertex wherever a perpendicular edge crosses the open segment
/// `pf`–`pt` through both interiors.
fn split_crossings(
    state: &mut GraphState,
    pf: Point,
    pt: Point,
    eps: f64,
    touched: &mut HashSet<VertexId>,
) {
    let Some(axis) = axis_between(&pf, &pt, eps) else {
        return;
    };
    let across = pf.across(axis);
    let lo = pf.along(axis).min(pt.along(axis));
    let hi = pf.along(axis).max(pt.along(axis));

    for edge_id in state.sorted_edge_ids() {
        let Some((pa, pb)) = state.edge_points(edge_id) else {
            continue;
        };
        if axis_between(&pa, &pb, eps) != Some(axis.perpendicular()) {
            continue;
        }
        let placed = state.edge(edge_id).map_or(false, |e| {
            [e.a, e.b]
                .iter()
                .all(|v| state.vertex(*v).map_or(false, |x| x.placed))
        });
        if !placed {
            continue;
        }
        let c = pa.along(axis);
        if c <= lo + eps || c >= hi - eps {
            continue;
        }
        let elo = pa.across(axis).min(pb.across(axis));
        let ehi = pa.across(axis).max(pb.across(axis));
        if across <= elo + eps || across >= ehi - eps {
            continue;
        }
        let crossing = match axis {
            Axis::Horizontal => Point::new(c, across),
            Axis::Vertical => Point::new(across, c),
        };
        if let Some(v) = split_edge_at(state, edge_id, crossing) {
            touched.insert(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn policy() -> GeometryPolicy {
        GeometryPolicy::default()
    }

    #[test]
    fn test_straight_run_bonds_to_intermediate_vertices() {
        let mut g = GraphState::new();
        let a = g.add_vertex(p(0.0, 0.0), Ownership::Free);
        let b = g.add_vertex(p(30.0, 0.0), Ownership::Free);
        let m1 = g.add_vertex(p(20.0, 0.0), Ownership::Free);
        let m2 = g.add_vertex(p(10.0, 0.0), Ownership::Free);

        connect(&mut g, a, b, RouteStrategy::default(), &policy()).unwrap();
        assert!(g.edge_between(a, m2).is_some());
        assert!(g.edge_between(m2, m1).is_some());
        assert!(g.edge_between(m1, b).is_some());
        assert!(g.edge_between(a, b).is_none());
    }

    #[test]
    fn test_l_shape_corner_per_strategy() {
        for (strategy, corner) in [
            (RouteStrategy::HorizontalThenVertical, p(20.0, 0.0)),
            (RouteStrategy::VerticalThenHorizontal, p(0.0, 10.0)),
        ] {
            let mut g = GraphState::new();
            let a = g.add_vertex(p(0.0, 0.0), Ownership::Free);
            let b = g.add_vertex(p(20.0, 10.0), Ownership::Free);
            connect(&mut g, a, b, strategy, &policy()).unwrap();

            let c = g.find_vertex_at(corner, 1e-6).expect("corner vertex");
            assert_eq!(g.vertex_count(), 3);
            for (x, y) in [(a, c), (c, b)] {
                let e = g.edge_between(x, y).unwrap();
                let (pa, pb) = g.edge_points(e).unwrap();
                assert!(axis_between(&pa, &pb, 1e-6).is_some());
            }
        }
    }

    #[test]
    fn test_corner_on_existing_wire_splits_it() {
        let mut g = GraphState::new();
        let top = g.add_vertex(p(20.0, -10.0), Ownership::Free);
        let bottom = g.add_vertex(p(20.0, -30.0), Ownership::Free);
        g.add_edge(top, bottom);
        let a = g.add_vertex(p(0.0, -20.0), Ownership::Free);
        let b = g.add_vertex(p(20.0, 10.0), Ownership::Free);

        connect(&mut g, a, b, RouteStrategy::HorizontalThenVertical, &policy()).unwrap();
        let corner = g.find_vertex_at(p(20.0, -20.0), 1e-6).expect("split vertex");
        assert!(g.edge_between(top, bottom).is_none());
        assert!(g.edge_between(corner, top).is_some());
        assert!(g.edge_between(corner, bottom).is_some());
        assert!(g.edge_between(corner, a).is_some());
        // The vertical leg continues from the corner through `top` to `b`.
        assert!(g.edge_between(top, b).is_some());
    }

    #[test]
    fn test_crossing_wire_becomes_four_way_junction() {
        let mut g = GraphState::new();
        let up = g.add_vertex(p(10.0, 0.0), Ownership::Free);
        let down = g.add_vertex(p(10.0, 20.0), Ownership::Free);
        g.add_edge(up, down);
        let a = g.add_vertex(p(0.0, 10.0), Ownership::Free);
        let b = g.add_vertex(p(20.0, 10.0), Ownership::Free);

        connect(&mut g, a, b, RouteStrategy::default(), &policy()).unwrap();
        let x = g.find_vertex_at(p(10.0, 10.0), 1e-6).expect("junction");
        assert_eq!(g.degree(x), 4);
        assert_eq!(g.edge_count(), 4);
        let net = g.vertex(a).unwrap().net;
        assert!(net.is_some());
        for v in [b, up, down, x] {
            assert_eq!(g.vertex(v).unwrap().net, net);
        }
    }

    #[test]
    fn test_contract_violations() {
        let mut g = GraphState::new();
        let a = g.add_vertex(p(0.0, 0.0), Ownership::Free);
        let ghost = VertexId::new();
        assert_eq!(
            connect(&mut g, a, a, RouteStrategy::default(), &policy()),
            Err(EngineError::SelfConnection(a))
        );
        assert_eq!(
            connect(&mut g, a, ghost, RouteStrategy::default(), &policy()),
            Err(EngineError::UnknownVertex(ghost))
        );
    }

    #[test]
    fn test_connect_points_reuses_and_snaps() {
        let mut g = GraphState::new();
        let a = g.add_vertex(p(0.0, 0.0), Ownership::Free);
        let mut snapping = policy();
        snapping.snap_to_grid = true;
        connect_points(&mut g, p(0.4, -0.3), p(31.0, 0.0), RouteStrategy::default(), &snapping)
            .unwrap();
        let b = g.find_vertex_at(p(30.0, 0.0), 1e-6).expect("snapped end");
        assert!(g.edge_between(a, b).is_some());
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn test_corner_point() {
        let s = p(1.0, 2.0);
        let e = p(5.0, 7.0);
        assert_eq!(RouteStrategy::HorizontalThenVertical.corner(s, e), p(5.0, 2.0));
        assert_eq!(RouteStrategy::VerticalThenHorizontal.corner(s, e), p(1.0, 7.0));
        assert_eq!(Axis::Horizontal.perpendicular(), Axis::Vertical);
    }
}
