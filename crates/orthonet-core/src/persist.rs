//! The segment list exchanged with the document layer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::GeometryPolicy;
use crate::geometry::{axis_between, Point};
use crate::graph::{GraphState, NetId, NetName, OwnerId, Ownership, PinId, VertexId};
use crate::nets;

/// Where a segment endpoint attaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttachmentPoint {
    Free { x: f64, y: f64 },
    Pin { owner: OwnerId, pin: PinId },
}

impl AttachmentPoint {
    pub fn free(x: f64, y: f64) -> Self {
        AttachmentPoint::Free { x, y }
    }

    pub fn pin(owner: OwnerId, pin: &str) -> Self {
        AttachmentPoint::Pin {
            owner,
            pin: PinId::new(pin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSegment {
    pub start: AttachmentPoint,
    pub end: AttachmentPoint,
}

impl WireSegment {
    pub fn new(start: AttachmentPoint, end: AttachmentPoint) -> Self {
        Self { start, end }
    }
}

/// One persisted wire: a connected set of segments sharing a net.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedWire {
    #[serde(default)]
    pub net: Option<NetId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub user_named: bool,
    pub segments: Vec<WireSegment>,
}

/// Placeholder for pin vertices until their owner is synced.
const PIN_PLACEHOLDER: Point = Point { x: 0.0, y: 0.0 };

struct Builder<'a> {
    state: GraphState,
    policy: &'a GeometryPolicy,
    pins: HashMap<(OwnerId, PinId), VertexId>,
    free: HashMap<(i64, i64), VertexId>,
}

impl Builder<'_> {
    fn grid_key(&self, x: f64, y: f64) -> (i64, i64) {
        let inv = if self.policy.epsilon > 0.0 {
            1.0 / self.policy.epsilon
        } else {
            1e6
        };
        ((x * inv).round() as i64, (y * inv).round() as i64)
    }

    fn resolve(&mut self, at: &AttachmentPoint) -> VertexId {
        match at {
            AttachmentPoint::Free { x, y } => {
                let key = self.grid_key(*x, *y);
                if let Some(v) = self.free.get(&key) {
                    return *v;
                }
                let v = self.state.add_vertex(Point::new(*x, *y), Ownership::Free);
                self.free.insert(key, v);
                v
            }
            AttachmentPoint::Pin { owner, pin } => {
                if let Some(v) = self.pins.get(&(*owner, pin.clone())) {
                    return *v;
                }
                let v = self.state.add_vertex(
                    PIN_PLACEHOLDER,
                    Ownership::PinOwned {
                        owner: *owner,
                        pin: pin.clone(),
                    },
                );
                if let Some(vertex) = self.state.vertex_mut(v) {
                    vertex.placed = false;
                }
                self.pins.insert((*owner, pin.clone()), v);
                v
            }
        }
    }
}

/// Build a graph from persisted wires, replacing nothing: the result is a
/// fresh state. Pin vertices stay unplaced until `sync_pins` runs for
/// their owner; no normalization happens here.
pub fn import_wires(wires: &[PersistedWire], policy: &GeometryPolicy) -> GraphState {
    let mut b = Builder {
        state: GraphState::new(),
        policy,
        pins: HashMap::new(),
        free: HashMap::new(),
    };

    for wire in wires {
        let mut members: Vec<VertexId> = Vec::with_capacity(wire.segments.len() * 2);
        for seg in &wire.segments {
            let start = b.resolve(&seg.start);
            let end = b.resolve(&seg.end);
            if start == end {
                log::warn!("skipping zero-length segment in wire {:?}", wire.name);
                continue;
            }
            if let (AttachmentPoint::Free { .. }, AttachmentPoint::Free { .. }) = (&seg.start, &seg.end) {
                let (pa, pb) = (b.state.point(start), b.state.point(end));
                if let (Some(pa), Some(pb)) = (pa, pb) {
                    if axis_between(&pa, &pb, policy.epsilon).is_none() {
                        log::warn!("diagonal segment ({}, {}) -> ({}, {}) imported as-is", pa.x, pa.y, pb.x, pb.y);
                    }
                }
            }
            b.state.add_edge(start, end);
            members.push(start);
            members.push(end);
        }

        if let Some(net) = wire.net {
            for v in &members {
                b.state.set_net(*v, Some(net));
            }
            if let Some(name) = &wire.name {
                b.state.net_names.insert(
                    net,
                    NetName {
                        name: name.clone(),
                        user_assigned: wire.user_named,
                    },
                );
            }
        }
    }

    let mut state = b.state;
    nets::restore_counter(&mut state);
    nets::discover_nets(&mut state);
    log::info!(
        "imported {} wires: {} vertices, {} edges",
        wires.len(),
        state.vertex_count(),
        state.edge_count()
    );
    state
}

fn attachment(state: &GraphState, v: VertexId) -> Option<AttachmentPoint> {
    let vertex = state.vertex(v)?;
    Some(match &vertex.ownership {
        Ownership::PinOwned { owner, pin } => AttachmentPoint::Pin {
            owner: *owner,
            pin: pin.clone(),
        },
        Ownership::Free | Ownership::DetachedPin => AttachmentPoint::free(vertex.point.x, vertex.point.y),
    })
}

/// One persisted wire per connected component with at least one edge.
pub fn export_wires(state: &GraphState) -> Vec<PersistedWire> {
    let mut wires: Vec<PersistedWire> = nets::components(state)
        .into_iter()
        .filter(|c| !c.edges.is_empty())
        .map(|comp| {
            let net = comp
                .vertices
                .iter()
                .find_map(|v| state.vertex(*v).and_then(|x| x.net));
            let name = net.and_then(|n| state.net_name(n));
            let segments = comp
                .edges
                .iter()
                .filter_map(|e| {
                    let edge = state.edge(*e)?;
                    Some(WireSegment::new(attachment(state, edge.a)?, attachment(state, edge.b)?))
                })
                .collect();
            PersistedWire {
                net,
                name: name.map(|n| n.name.clone()),
                user_named: name.map_or(false, |n| n.user_assigned),
                segments,
            }
        })
        .collect();
    wires.sort_by(|a, b| a.name.cmp(&b.name).then(a.net.cmp(&b.net)));
    wires
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::{sync_pins, PinDefinition, Transform};
    use uuid::Uuid;

    fn key(at: &AttachmentPoint) -> String {
        serde_json::to_string(at).unwrap()
    }

    fn segment_set(wires: &[PersistedWire]) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = wires
            .iter()
            .flat_map(|w| w.segments.iter())
            .map(|s| {
                let (a, b) = (key(&s.start), key(&s.end));
                if a <= b {
                    (a, b)
                } else {
                    (b, a)
                }
            })
            .collect();
        out.sort();
        out
    }

    fn sample(owner: OwnerId) -> Vec<PersistedWire> {
        vec![
            PersistedWire {
                net: Some(NetId::new()),
                name: Some("CLK".to_string()),
                user_named: true,
                segments: vec![
                    WireSegment::new(AttachmentPoint::pin(owner, "1"), AttachmentPoint::free(20.0, 0.0)),
                    WireSegment::new(AttachmentPoint::free(20.0, 0.0), AttachmentPoint::free(20.0, 30.0)),
                ],
            },
            PersistedWire {
                net: None,
                name: None,
                user_named: false,
                segments: vec![WireSegment::new(
                    AttachmentPoint::pin(owner, "2"),
                    AttachmentPoint::free(-20.0, 0.0),
                )],
            },
        ]
    }

    #[test]
    fn test_import_builds_unplaced_pins_and_shared_points() {
        let owner = Uuid::new_v4();
        let state = import_wires(&sample(owner), &GeometryPolicy::default());
        assert_eq!(state.vertex_count(), 5);
        assert_eq!(state.edge_count(), 3);
        let pins = state.pins_of(owner);
        assert_eq!(pins.len(), 2);
        assert!(pins.iter().all(|p| !state.vertex(*p).unwrap().placed));
    }

    #[test]
    fn test_import_restores_names_and_mints_missing() {
        let owner = Uuid::new_v4();
        let wires = sample(owner);
        let state = import_wires(&wires, &GeometryPolicy::default());
        let clk = wires[0].net.unwrap();
        assert_eq!(state.net_name(clk).unwrap().name, "CLK");
        assert!(state.net_name(clk).unwrap().user_assigned);
        assert_eq!(state.net_names().len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_segments() {
        let owner = Uuid::new_v4();
        let wires = sample(owner);
        let policy = GeometryPolicy::default();
        let mut state = import_wires(&wires, &policy);
        sync_pins(
            &mut state,
            owner,
            &Transform::translate(0.0, 0.0),
            &[PinDefinition::new("1", 0.0, 0.0), PinDefinition::new("2", -10.0, 0.0)],
        );
        let exported = export_wires(&state);
        assert_eq!(exported.len(), 2);
        assert_eq!(segment_set(&exported), segment_set(&wires));
        let clk = exported.iter().find(|w| w.name.as_deref() == Some("CLK")).unwrap();
        assert_eq!(clk.net, wires[0].net);
        assert!(clk.user_named);
    }

    #[test]
    fn test_detached_pin_exports_as_free_point() {
        let mut g = GraphState::new();
        let a = g.add_vertex(Point::new(0.0, 0.0), Ownership::DetachedPin);
        let b = g.add_vertex(Point::new(0.0, 5.0), Ownership::Free);
        g.add_edge(a, b);
        let wires = export_wires(&g);
        assert_eq!(wires.len(), 1);
        let seg = &wires[0].segments[0];
        for at in [&seg.start, &seg.end] {
            assert!(matches!(at, AttachmentPoint::Free { .. }));
        }
    }

    #[test]
    fn test_zero_length_segments_are_skipped() {
        let wires = vec![PersistedWire {
            net: None,
            name: None,
            user_named: false,
            segments: vec![WireSegment::new(AttachmentPoint::free(1.0, 1.0), AttachmentPoint::free(1.0, 1.0))],
        }];
        let state = import_wires(&wires, &GeometryPolicy::default());
        assert_eq!(state.edge_count(), 0);
    }
}
