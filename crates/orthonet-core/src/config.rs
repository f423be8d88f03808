use serde::{Deserialize, Serialize};

use crate::geometry::{snap_to_grid, Point};

/// Tolerance and grid rules shared by every geometric test in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryPolicy {
    /// Two coordinates closer than this are the same coordinate.
    pub epsilon: f64,
    /// Grid pitch used when snapping is enabled.
    pub grid_step: f64,
    pub snap_to_grid: bool,
}

impl Default for GeometryPolicy {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            grid_step: 10.0,
            snap_to_grid: false,
        }
    }
}

impl GeometryPolicy {
    /// Snap `p` to the grid if snapping is enabled.
    pub fn snap(&self, p: Point) -> Point {
        if self.snap_to_grid {
            snap_to_grid(&p, self.grid_step)
        } else {
            p
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub geometry: GeometryPolicy,
    /// Upper bound on normalization passes before giving up on a fixed point.
    pub max_normalize_passes: usize,
    /// Push committed commands onto the undo stack.
    pub record_history: bool,
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryPolicy::default(),
            max_normalize_passes: 8,
            record_history: true,
            history_limit: 100,
        }
    }
}

impl EngineConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
