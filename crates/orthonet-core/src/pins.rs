use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::graph::{GraphState, OwnerId, Ownership, PinId, VertexId};

/// Placement of a symbol or footprint on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation offset.
    pub offset: Point,
    /// Rotation in degrees (0, 90, 180, 270).
    pub rotation: f64,
    /// Mirror about X axis.
    pub mirror_x: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: Point::new(0.0, 0.0),
            rotation: 0.0,
            mirror_x: false,
        }
    }
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn apply(&self, point: &Point) -> Point {
        let mut p = *point;

        if self.mirror_x {
            p.y = -p.y;
        }

        let (rx, ry) = match self.rotation.rem_euclid(360.0) {
            // Exact quarter turns keep pins on the grid.
            r if r == 0.0 => (p.x, p.y),
            r if r == 90.0 => (-p.y, p.x),
            r if r == 180.0 => (-p.x, -p.y),
            r if r == 270.0 => (p.y, -p.x),
            r => {
                let rad = r.to_radians();
                let (sin_r, cos_r) = rad.sin_cos();
                (p.x * cos_r - p.y * sin_r, p.x * sin_r + p.y * cos_r)
            }
        };

        Point::new(rx + self.offset.x, ry + self.offset.y)
    }
}

/// A pin's position relative to its owner's origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinDefinition {
    pub pin: PinId,
    pub offset: Point,
}

impl PinDefinition {
    pub fn new(pin: &str, x: f64, y: f64) -> Self {
        Self {
            pin: PinId::new(pin),
            offset: Point::new(x, y),
        }
    }
}

/// Move every pin vertex of `owner` to its transformed definition point.
/// Returns the vertices that moved.
pub fn sync_pins(
    state: &mut GraphState,
    owner: OwnerId,
    transform: &Transform,
    definitions: &[PinDefinition],
) -> HashSet<VertexId> {
    let by_pin: HashMap<&PinId, &PinDefinition> =
        definitions.iter().map(|d| (&d.pin, d)).collect();
    let mut moved = HashSet::new();

    for v in state.pins_of(owner) {
        let Some(vertex) = state.vertex_mut(v) else {
            continue;
        };
        let Ownership::PinOwned { pin, .. } = &vertex.ownership else {
            continue;
        };
        match by_pin.get(pin) {
            Some(def) => {
                vertex.point = transform.apply(&def.offset);
                vertex.placed = true;
                moved.insert(v);
            }
            None => {
                log::warn!("owner {owner} has no definition for pin {pin}; left unplaced");
            }
        }
    }
    moved
}

/// Turn every pin vertex of a deleted owner into a free vertex, keeping its
/// wiring. Returns the released vertices.
pub fn release_pins(state: &mut GraphState, owner: OwnerId) -> HashSet<VertexId> {
    let released: HashSet<VertexId> = state.pins_of(owner).into_iter().collect();
    for v in &released {
        state.set_ownership(*v, Ownership::Free);
        if let Some(vertex) = state.vertex_mut(*v) {
            // An unplaced pin has no meaningful position to keep.
            if !vertex.placed {
                log::warn!("released pin vertex {v} was never placed");
                vertex.placed = true;
            }
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uuid::Uuid;

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10.0, 20.0);
        let p = t.apply(&Point::new(5.0, 5.0));
        assert_relative_eq!(p.x, 15.0);
        assert_relative_eq!(p.y, 25.0);
    }

    #[test]
    fn test_transform_quarter_turn_is_exact() {
        let t = Transform::translate(100.0, 0.0).with_rotation(90.0);
        let p = t.apply(&Point::new(10.0, 0.0));
        assert_eq!(p, Point::new(100.0, 10.0));
        let t = Transform::default().with_rotation(-90.0);
        assert_eq!(t.apply(&Point::new(10.0, 0.0)), Point::new(0.0, -10.0));
    }

    #[test]
    fn test_transform_mirror() {
        let t = Transform {
            mirror_x: true,
            ..Default::default()
        };
        assert_eq!(t.apply(&Point::new(3.0, 4.0)), Point::new(3.0, -4.0));
    }

    #[test]
    fn test_sync_places_known_pins() {
        let mut g = GraphState::new();
        let owner = Uuid::new_v4();
        let known = g.add_vertex(
            Point::new(0.0, 0.0),
            Ownership::PinOwned {
                owner,
                pin: PinId::new("1"),
            },
        );
        let unknown = g.add_vertex(
            Point::new(0.0, 0.0),
            Ownership::PinOwned {
                owner,
                pin: PinId::new("9"),
            },
        );
        g.vertex_mut(known).unwrap().placed = false;
        g.vertex_mut(unknown).unwrap().placed = false;

        let moved = sync_pins(
            &mut g,
            owner,
            &Transform::translate(50.0, 50.0),
            &[PinDefinition::new("1", -10.0, 0.0)],
        );
        assert_eq!(moved, HashSet::from([known]));
        assert_eq!(g.point(known), Some(Point::new(40.0, 50.0)));
        assert!(g.vertex(known).unwrap().placed);
        assert!(!g.vertex(unknown).unwrap().placed);
    }

    #[test]
    fn test_release_pins_keeps_wiring() {
        let mut g = GraphState::new();
        let owner = Uuid::new_v4();
        let pin = g.add_vertex(
            Point::new(0.0, 0.0),
            Ownership::PinOwned {
                owner,
                pin: PinId::new("A"),
            },
        );
        let free = g.add_vertex(Point::new(10.0, 0.0), Ownership::Free);
        g.add_edge(pin, free);

        let released = release_pins(&mut g, owner);
        assert_eq!(released, HashSet::from([pin]));
        assert_eq!(g.vertex(pin).unwrap().ownership, Ownership::Free);
        assert_eq!(g.degree(pin), 1);
        assert!(g.pins_of(owner).is_empty());
    }
}
