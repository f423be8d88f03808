//! Interactive drag of wires and pin owners.
//!
//! A session holds the published state it started from and rebuilds its
//! working copy from that snapshot on every [`DragSession::update`], so the
//! preview only depends on the cumulative delta. Nothing reaches the
//! published state until the engine commits the session.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::geometry::{axis_between, Axis, Point};
use crate::graph::{EdgeId, GraphState, OwnerId, Ownership, VertexId};
use crate::normalize::{self, NormalizeReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragPhase {
    Ready,
    Dragging,
    Committed,
    Cancelled,
}

/// What the user grabbed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSelection {
    /// Symbols or footprints whose pins move with the drag.
    pub owners: Vec<OwnerId>,
    /// Wire edges whose free endpoints move with the drag.
    pub edges: Vec<EdgeId>,
}

impl DragSelection {
    pub fn edges(edges: impl IntoIterator<Item = EdgeId>) -> Self {
        Self {
            owners: Vec::new(),
            edges: edges.into_iter().collect(),
        }
    }

    pub fn owners(owners: impl IntoIterator<Item = OwnerId>) -> Self {
        Self {
            owners: owners.into_iter().collect(),
            edges: Vec::new(),
        }
    }
}

/// Result of ending a drag.
#[derive(Debug, Clone)]
pub struct DragOutcome {
    pub state: GraphState,
    /// Every vertex the drag moved, created or anchored.
    pub epicenter: HashSet<VertexId>,
    pub report: NormalizeReport,
}

#[derive(Debug)]
pub struct DragSession {
    base: Arc<GraphState>,
    config: EngineConfig,
    phase: DragPhase,
    movable: Vec<VertexId>,
    selected_edges: Vec<EdgeId>,
    working: Option<GraphState>,
    epicenter: HashSet<VertexId>,
    delta: Point,
    /// Detached vertex ids per (anchor, mover), kept stable across updates.
    detached_ids: HashMap<(VertexId, VertexId), VertexId>,
}

impl DragSession {
    pub fn new(base: Arc<GraphState>, config: EngineConfig) -> Self {
        Self {
            base,
            config,
            phase: DragPhase::Ready,
            movable: Vec::new(),
            selected_edges: Vec::new(),
            working: None,
            epicenter: HashSet::new(),
            delta: Point::new(0.0, 0.0),
            detached_ids: HashMap::new(),
        }
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// The state this session was started from.
    pub fn base(&self) -> &Arc<GraphState> {
        &self.base
    }

    /// Vertices that follow the pointer, in id order.
    pub fn movable(&self) -> &[VertexId] {
        &self.movable
    }

    /// The last applied (snapped) delta.
    pub fn delta(&self) -> Point {
        self.delta
    }

    /// Start dragging. Returns false and stays `Ready` when the selection
    /// moves nothing.
    pub fn begin(&mut self, selection: &DragSelection) -> bool {
        if self.phase != DragPhase::Ready {
            return false;
        }
        let mut movable: HashSet<VertexId> = HashSet::new();
        for owner in &selection.owners {
            movable.extend(self.base.pins_of(*owner));
        }

        let mut edges: Vec<EdgeId> = selection
            .edges
            .iter()
            .copied()
            .filter(|e| self.base.edge(*e).is_some())
            .collect();
        edges.sort_unstable();
        edges.dedup();
        for e in &edges {
            if let Some(edge) = self.base.edge(*e) {
                for v in [edge.a, edge.b] {
                    let is_pin = self.base.vertex(v).map_or(true, |x| x.ownership.is_pin());
                    if !is_pin {
                        movable.insert(v);
                    }
                }
            }
        }

        if movable.is_empty() {
            log::debug!("drag begin ignored: selection has nothing movable");
            return false;
        }
        let mut movable: Vec<VertexId> = movable.into_iter().collect();
        movable.sort_unstable();
        log::debug!("drag begin: {} movable vertices, {} edges", movable.len(), edges.len());

        self.movable = movable;
        self.selected_edges = edges;
        self.phase = DragPhase::Dragging;
        true
    }

    /// Recompute the preview for the cumulative `delta` since begin.
    pub fn update(&mut self, delta: Point) -> Result<(), EngineError> {
        if self.phase != DragPhase::Dragging {
            return Err(EngineError::DragNotActive);
        }
        let policy = self.config.geometry;
        let eps = policy.epsilon;
        let delta = policy.snap(delta);

        let mut work = (*self.base).clone();
        let mut planned: HashMap<VertexId, Point> = HashMap::new();
        let mut settled: HashSet<VertexId> = self.movable.iter().copied().collect();
        let mut anchors: HashSet<VertexId> = HashSet::new();
        let mut queue: VecDeque<VertexId> = VecDeque::new();

        for v in &self.movable {
            if let Some(p) = self.base.point(*v) {
                planned.insert(*v, p.translate(delta.x, delta.y));
                queue.push_back(*v);
            }
        }

        // Pins at the fixed end of a selected edge split off a jog when the
        // pull leaves the edge's axis.
        for e in &self.selected_edges {
            let Some(edge) = self.base.edge(*e).copied() else {
                continue;
            };
            for (pin, mover) in [(edge.a, edge.b), (edge.b, edge.a)] {
                if settled.contains(&pin) || !settled.contains(&mover) {
                    continue;
                }
                let (Some(pp), Some(pm)) = (self.base.point(pin), self.base.point(mover)) else {
                    continue;
                };
                let Some(axis) = axis_between(&pp, &pm, eps) else {
                    continue;
                };
                if delta.across(axis).abs() <= eps {
                    continue;
                }
                let Some(target) = planned.get(&mover).map(|m| corner_for(pp, *m, axis)) else {
                    continue;
                };
                if let Some(d) = detach(&mut self.detached_ids, &mut work, pin, mover) {
                    planned.insert(d, target);
                    settled.insert(d);
                    settled.insert(pin);
                    anchors.insert(pin);
                    queue.push_back(d);
                }
            }
        }

        while let Some(m) = queue.pop_front() {
            let (Some(old), Some(new)) = (work.point(m), planned.get(&m).copied()) else {
                continue;
            };
            for n in work.neighbors(m) {
                if settled.contains(&n) {
                    continue;
                }
                let Some(pn) = work.point(n) else {
                    continue;
                };
                let Some(axis) = axis_between(&old, &pn, eps) else {
                    continue;
                };
                let target = corner_for(pn, new, axis);
                if target.approx_eq(&pn, eps) {
                    continue;
                }
                let is_pin = work.vertex(n).map_or(false, |x| x.ownership.is_pin());
                if is_pin {
                    if let Some(d) = detach(&mut self.detached_ids, &mut work, n, m) {
                        planned.insert(d, target);
                        settled.insert(d);
                        queue.push_back(d);
                    }
                    settled.insert(n);
                    anchors.insert(n);
                } else {
                    planned.insert(n, target);
                    settled.insert(n);
                    queue.push_back(n);
                }
            }
        }

        for (v, p) in &planned {
            work.move_vertex(*v, *p);
        }

        self.epicenter = planned.keys().copied().chain(anchors).collect();
        log::debug!(
            "drag update ({}, {}): {} vertices moved",
            delta.x,
            delta.y,
            planned.len()
        );
        self.delta = delta;
        self.working = Some(work);
        Ok(())
    }

    /// The working copy while dragging, otherwise the base state.
    pub fn preview(&self) -> &GraphState {
        match (&self.phase, &self.working) {
            (DragPhase::Dragging, Some(work)) => work,
            _ => &self.base,
        }
    }

    pub fn epicenter(&self) -> &HashSet<VertexId> {
        &self.epicenter
    }

    /// Drop the working copy. The base state is untouched.
    pub fn cancel(&mut self) {
        if self.phase == DragPhase::Dragging || self.phase == DragPhase::Ready {
            self.working = None;
            self.epicenter.clear();
            self.phase = DragPhase::Cancelled;
            log::debug!("drag cancelled");
        }
    }

    /// Make every detached jog permanent and normalize around the epicenter.
    pub fn end(&mut self) -> Result<DragOutcome, EngineError> {
        if self.phase != DragPhase::Dragging {
            return Err(EngineError::DragNotActive);
        }
        let mut state = self.working.take().unwrap_or_else(|| (*self.base).clone());
        let detached: Vec<VertexId> = state
            .vertices()
            .values()
            .filter(|v| v.ownership == Ownership::DetachedPin)
            .map(|v| v.id)
            .collect();
        for v in &detached {
            state.set_ownership(*v, Ownership::Free);
        }

        let epicenter = std::mem::take(&mut self.epicenter);
        let report = normalize::normalize(&mut state, &epicenter, &self.config);
        self.phase = DragPhase::Committed;
        log::debug!(
            "drag end: {} jogs kept, {} normalization passes",
            detached.len(),
            report.passes
        );
        Ok(DragOutcome {
            state,
            epicenter,
            report,
        })
    }
}

/// Split `anchor` off `mover`: a detached vertex at the anchor's point
/// takes over the edge to `mover` and hangs off the anchor.
fn detach(
    ids: &mut HashMap<(VertexId, VertexId), VertexId>,
    work: &mut GraphState,
    anchor: VertexId,
    mover: VertexId,
) -> Option<VertexId> {
    let edge = work.edge_between(anchor, mover)?;
    let vertex = work.vertex(anchor)?;
    let (point, net) = (vertex.point, vertex.net);
    let id = *ids.entry((anchor, mover)).or_insert_with(VertexId::new);

    work.remove_edge(edge);
    work.insert_vertex(id, point, Ownership::DetachedPin);
    work.set_net(id, net);
    work.add_edge(anchor, id);
    work.add_edge(id, mover);
    log::debug!("detached pin vertex {anchor} from {mover}");
    Some(id)
}

/// Where `fixed` must go to stay on `axis` with a vertex now at `moved`.
fn corner_for(fixed: Point, moved: Point, axis: Axis) -> Point {
    match axis {
        Axis::Horizontal => Point::new(fixed.x, moved.y),
        Axis::Vertical => Point::new(moved.x, fixed.y),
    }
}
