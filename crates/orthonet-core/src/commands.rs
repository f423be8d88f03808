use std::collections::HashSet;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::geometry::Point;
use crate::graph::{EdgeId, GraphState, NetId, OwnerId, VertexId};
use crate::nets;
use crate::pins::{self, PinDefinition, Transform};
use crate::routing::{self, RouteStrategy};

/// A structural edit applied to a working copy of the graph.
pub trait Command: std::fmt::Debug + Send {
    /// Apply the edit. Returns the vertices normalization has to look at.
    fn apply(
        &mut self,
        state: &mut GraphState,
        config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError>;
    /// Human-readable description for the undo/redo history.
    fn description(&self) -> &str;
}

// ══════════════════════════════════════════════════════════════════════
// Concrete Commands
// ══════════════════════════════════════════════════════════════════════

/// Route a wire between two existing vertices.
#[derive(Debug)]
pub struct ConnectCommand {
    pub start: VertexId,
    pub end: VertexId,
    pub strategy: RouteStrategy,
}

impl ConnectCommand {
    pub fn new(start: VertexId, end: VertexId, strategy: RouteStrategy) -> Self {
        Self { start, end, strategy }
    }
}

impl Command for ConnectCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        routing::connect(state, self.start, self.end, self.strategy, &config.geometry)
    }

    fn description(&self) -> &str {
        "Connect"
    }
}

/// Route a wire between two sheet points, as the wire tool does.
#[derive(Debug)]
pub struct ConnectPointsCommand {
    pub from: Point,
    pub to: Point,
    pub strategy: RouteStrategy,
}

impl ConnectPointsCommand {
    pub fn new(from: Point, to: Point, strategy: RouteStrategy) -> Self {
        Self { from, to, strategy }
    }
}

impl Command for ConnectPointsCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        routing::connect_points(state, self.from, self.to, self.strategy, &config.geometry)
    }

    fn description(&self) -> &str {
        "Draw wire"
    }
}

/// Remove edges; their endpoints are left for normalization.
#[derive(Debug)]
pub struct DeleteEdgesCommand {
    pub edges: Vec<EdgeId>,
}

impl DeleteEdgesCommand {
    pub fn new(edges: Vec<EdgeId>) -> Self {
        Self { edges }
    }
}

impl Command for DeleteEdgesCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        _config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        let mut touched = HashSet::new();
        for id in &self.edges {
            // Already-absent edges are a no-op.
            if let Some(edge) = state.remove_edge(*id) {
                touched.insert(edge.a);
                touched.insert(edge.b);
            }
        }
        Ok(touched)
    }

    fn description(&self) -> &str {
        "Delete wires"
    }
}

/// Remove vertices with their incident edges.
#[derive(Debug)]
pub struct DeleteVerticesCommand {
    pub vertices: Vec<VertexId>,
}

impl DeleteVerticesCommand {
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }
}

impl Command for DeleteVerticesCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        _config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        let mut touched = HashSet::new();
        for id in &self.vertices {
            touched.extend(state.neighbors(*id));
            state.remove_vertex(*id);
        }
        touched.retain(|v| state.contains_vertex(*v));
        Ok(touched)
    }

    fn description(&self) -> &str {
        "Delete junctions"
    }
}

/// Move an owner's pin vertices to their placed positions.
#[derive(Debug)]
pub struct SyncPinsCommand {
    pub owner: OwnerId,
    pub transform: Transform,
    pub definitions: Vec<PinDefinition>,
}

impl SyncPinsCommand {
    pub fn new(owner: OwnerId, transform: Transform, definitions: Vec<PinDefinition>) -> Self {
        Self {
            owner,
            transform,
            definitions,
        }
    }
}

impl Command for SyncPinsCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        _config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        let moved = pins::sync_pins(state, self.owner, &self.transform, &self.definitions);
        let mut touched = moved.clone();
        for v in &moved {
            touched.extend(state.neighbors(*v));
        }
        Ok(touched)
    }

    fn description(&self) -> &str {
        "Place pins"
    }
}

/// Free the pins of a deleted owner.
#[derive(Debug)]
pub struct ReleasePinsCommand {
    pub owner: OwnerId,
}

impl ReleasePinsCommand {
    pub fn new(owner: OwnerId) -> Self {
        Self { owner }
    }
}

impl Command for ReleasePinsCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        _config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        Ok(pins::release_pins(state, self.owner))
    }

    fn description(&self) -> &str {
        "Release pins"
    }
}

/// Give a net a user-chosen name.
#[derive(Debug)]
pub struct RenameNetCommand {
    pub net: NetId,
    pub name: String,
}

impl RenameNetCommand {
    pub fn new(net: NetId, name: &str) -> Self {
        Self {
            net,
            name: name.to_string(),
        }
    }
}

impl Command for RenameNetCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        _config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        nets::rename_net(state, self.net, &self.name)?;
        Ok(HashSet::new())
    }

    fn description(&self) -> &str {
        "Rename net"
    }
}

/// Bring the whole graph back to canonical form.
#[derive(Debug, Default)]
pub struct NormalizeAllCommand;

impl Command for NormalizeAllCommand {
    fn apply(
        &mut self,
        state: &mut GraphState,
        _config: &EngineConfig,
    ) -> Result<HashSet<VertexId>, EngineError> {
        Ok(state.vertices().keys().copied().collect())
    }

    fn description(&self) -> &str {
        "Clean up wires"
    }
}

/// One committed step: the published states on either side of it.
#[derive(Debug, Clone)]
struct HistoryEntry {
    description: String,
    before: Arc<GraphState>,
    after: Arc<GraphState>,
}

/// Manages the undo/redo history stack.
///
/// Entries hold shared snapshots, so undo is a pointer swap rather than a
/// replay of inverse edits.
#[derive(Debug)]
pub struct CommandHistory {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    limit: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit,
        }
    }

    /// Record a committed step. Recording clears the redo stack.
    pub fn record(&mut self, description: &str, before: Arc<GraphState>, after: Arc<GraphState>) {
        if self.limit == 0 {
            return;
        }
        self.undo_stack.push(HistoryEntry {
            description: description.to_string(),
            before,
            after,
        });
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
        self.redo_stack.clear();
    }

    /// The state to publish after undoing the latest step.
    pub fn undo(&mut self) -> Option<Arc<GraphState>> {
        let entry = self.undo_stack.pop()?;
        let state = Arc::clone(&entry.before);
        self.redo_stack.push(entry);
        Some(state)
    }

    /// The state to publish after redoing the latest undone step.
    pub fn redo(&mut self) -> Option<Arc<GraphState>> {
        let entry = self.redo_stack.pop()?;
        let state = Arc::clone(&entry.after);
        self.undo_stack.push(entry);
        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.description.as_str())
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
