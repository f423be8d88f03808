//! The published graph and every committed way of changing it.

use std::sync::Arc;

use crate::commands::{
    Command, CommandHistory, ConnectCommand, ConnectPointsCommand, DeleteEdgesCommand,
    DeleteVerticesCommand, NormalizeAllCommand, ReleasePinsCommand, RenameNetCommand,
    SyncPinsCommand,
};
use crate::config::EngineConfig;
use crate::delta::ChangeSet;
use crate::drag::{DragSelection, DragSession};
use crate::error::EngineError;
use crate::geometry::{BBox, Point};
use crate::graph::{EdgeId, GraphState, NetId, OwnerId, VertexId};
use crate::nets::{self, NetSummary};
use crate::normalize;
use crate::persist::{self, PersistedWire};
use crate::pins::{PinDefinition, Transform};
use crate::routing::RouteStrategy;

/// Owns the published [`GraphState`].
///
/// Every mutation runs on a private copy: apply, normalize the touched
/// region, reconcile nets, then swap the published `Arc` and report the
/// difference. Readers holding an older snapshot keep a consistent view.
#[derive(Debug)]
pub struct WireEngine {
    published: Arc<GraphState>,
    config: EngineConfig,
    history: CommandHistory,
}

impl Default for WireEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl WireEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            published: Arc::new(GraphState::new()),
            history: CommandHistory::new(config.history_limit),
            config,
        }
    }

    pub fn state(&self) -> &GraphState {
        &self.published
    }

    /// A shared handle to the current state.
    pub fn snapshot(&self) -> Arc<GraphState> {
        Arc::clone(&self.published)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    // ── Bulk load / save ─────────────────────────────────────────────

    /// Replace the whole graph with persisted wires. Pins stay unplaced
    /// until [`WireEngine::sync_pins`] runs for their owner. Clears history.
    pub fn load(&mut self, wires: &[PersistedWire]) -> ChangeSet {
        let state = persist::import_wires(wires, &self.config.geometry);
        let changes = ChangeSet::diff(&self.published, &state);
        self.published = Arc::new(state);
        self.history.clear();
        changes
    }

    pub fn export(&self) -> Vec<PersistedWire> {
        persist::export_wires(&self.published)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run `command` as one committed step.
    pub fn execute(&mut self, mut command: Box<dyn Command>) -> Result<ChangeSet, EngineError> {
        let mut work = (*self.published).clone();
        let touched = command.apply(&mut work, &self.config).map_err(|e| {
            log::error!("{} rejected: {e}", command.description());
            e
        })?;
        let report = normalize::normalize(&mut work, &touched, &self.config);
        let minted = nets::discover_nets(&mut work);
        log::debug!(
            "{}: {} passes, {} nets minted",
            command.description(),
            report.passes,
            minted
        );
        Ok(self.publish(command.description(), work))
    }

    pub fn connect(
        &mut self,
        start: VertexId,
        end: VertexId,
        strategy: RouteStrategy,
    ) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(ConnectCommand::new(start, end, strategy)))
    }

    pub fn connect_points(
        &mut self,
        from: Point,
        to: Point,
        strategy: RouteStrategy,
    ) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(ConnectPointsCommand::new(from, to, strategy)))
    }

    pub fn delete_edges(&mut self, edges: Vec<EdgeId>) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(DeleteEdgesCommand::new(edges)))
    }

    pub fn delete_vertices(&mut self, vertices: Vec<VertexId>) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(DeleteVerticesCommand::new(vertices)))
    }

    pub fn sync_pins(
        &mut self,
        owner: OwnerId,
        transform: Transform,
        definitions: Vec<PinDefinition>,
    ) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(SyncPinsCommand::new(owner, transform, definitions)))
    }

    pub fn release_pins(&mut self, owner: OwnerId) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(ReleasePinsCommand::new(owner)))
    }

    pub fn rename_net(&mut self, net: NetId, name: &str) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(RenameNetCommand::new(net, name)))
    }

    pub fn normalize_all(&mut self) -> Result<ChangeSet, EngineError> {
        self.execute(Box::new(NormalizeAllCommand))
    }

    // ── Drag ─────────────────────────────────────────────────────────

    /// Start a drag on the current state. `None` if the selection moves
    /// nothing.
    pub fn begin_drag(&self, selection: &DragSelection) -> Option<DragSession> {
        let mut session = DragSession::new(self.snapshot(), self.config.clone());
        session.begin(selection).then_some(session)
    }

    /// Commit a drag started by [`WireEngine::begin_drag`].
    pub fn commit_drag(&mut self, mut session: DragSession) -> Result<ChangeSet, EngineError> {
        if !Arc::ptr_eq(session.base(), &self.published) {
            log::warn!("drag started on a state that is no longer published; discarding it");
            session.cancel();
            return Err(EngineError::StaleDrag);
        }
        let outcome = session.end()?;
        let mut state = outcome.state;
        nets::discover_nets(&mut state);
        log::debug!("drag commit: epicenter of {} vertices", outcome.epicenter.len());
        Ok(self.publish("Drag", state))
    }

    // ── History ──────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Option<ChangeSet> {
        let description = self.history.undo_description()?.to_string();
        let state = self.history.undo()?;
        let changes = ChangeSet::diff(&self.published, &state);
        self.published = state;
        log::info!("undo: {description}");
        Some(changes)
    }

    pub fn redo(&mut self) -> Option<ChangeSet> {
        let description = self.history.redo_description()?.to_string();
        let state = self.history.redo()?;
        let changes = ChangeSet::diff(&self.published, &state);
        self.published = state;
        log::info!("redo: {description}");
        Some(changes)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn find_vertex_at(&self, point: Point) -> Option<VertexId> {
        self.published.find_vertex_at(point, self.config.geometry.epsilon)
    }

    pub fn find_edge_at(&self, point: Point) -> Option<EdgeId> {
        self.published.find_edge_at(point, self.config.geometry.epsilon)
    }

    pub fn vertices_in(&self, viewport: &BBox) -> Vec<VertexId> {
        self.published.vertices_in(viewport)
    }

    pub fn nets_summary(&self) -> Vec<NetSummary> {
        nets::nets_summary(&self.published)
    }

    fn publish(&mut self, description: &str, state: GraphState) -> ChangeSet {
        let changes = ChangeSet::diff(&self.published, &state);
        if changes.is_empty() {
            log::debug!("{description}: no change");
            return changes;
        }
        let before = Arc::clone(&self.published);
        let after = Arc::new(state);
        if self.config.record_history {
            self.history.record(description, before, Arc::clone(&after));
        }
        self.published = after;
        log::info!(
            "{description}: +{}/-{} vertices, +{}/-{} edges, {} moved, {} reowned",
            changes.created_vertices.len(),
            changes.deleted_vertices.len(),
            changes.created_edges.len(),
            changes.deleted_edges.len(),
            changes.moved_vertices.len(),
            changes.reowned_vertices.len()
        );
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Ownership;
    use crate::persist::{AttachmentPoint, WireSegment};
    use uuid::Uuid;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_connect_points_commits_one_net() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut engine = WireEngine::default();
        let changes = engine
            .connect_points(p(0.0, 0.0), p(20.0, 10.0), RouteStrategy::default())
            .unwrap();
        assert_eq!(changes.created_vertices.len(), 3);
        assert_eq!(changes.created_edges.len(), 2);
        let nets = engine.nets_summary();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].vertex_count, 3);
        assert!(engine.history().can_undo());
    }

    #[test]
    fn test_contract_error_leaves_state_untouched() {
        let mut engine = WireEngine::default();
        engine
            .connect_points(p(0.0, 0.0), p(10.0, 0.0), RouteStrategy::default())
            .unwrap();
        let before = engine.snapshot();
        let a = engine.find_vertex_at(p(0.0, 0.0)).unwrap();
        assert_eq!(
            engine.connect(a, a, RouteStrategy::default()),
            Err(EngineError::SelfConnection(a))
        );
        assert!(Arc::ptr_eq(&before, &engine.snapshot()));
    }

    #[test]
    fn test_undo_and_redo_restore_published_state() {
        let mut engine = WireEngine::default();
        engine
            .connect_points(p(0.0, 0.0), p(10.0, 0.0), RouteStrategy::default())
            .unwrap();
        let drawn = engine.snapshot();

        let changes = engine.undo().unwrap();
        assert_eq!(changes.deleted_vertices.len(), 2);
        assert_eq!(engine.state().vertex_count(), 0);

        engine.redo().unwrap();
        assert!(Arc::ptr_eq(&drawn, &engine.snapshot()));
        assert!(engine.redo().is_none());
    }

    #[test]
    fn test_noop_is_not_recorded() {
        let mut engine = WireEngine::default();
        let changes = engine.delete_edges(vec![EdgeId::new()]).unwrap();
        assert!(changes.is_empty());
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn test_stale_drag_is_rejected() {
        let mut engine = WireEngine::default();
        engine
            .connect_points(p(0.0, 0.0), p(10.0, 0.0), RouteStrategy::default())
            .unwrap();
        let edge = engine.find_edge_at(p(5.0, 0.0)).unwrap();
        let mut session = engine.begin_drag(&DragSelection::edges([edge])).unwrap();
        session.update(p(0.0, 10.0)).unwrap();

        engine
            .connect_points(p(0.0, 50.0), p(10.0, 50.0), RouteStrategy::default())
            .unwrap();
        assert!(matches!(engine.commit_drag(session), Err(EngineError::StaleDrag)));
    }

    #[test]
    fn test_drag_commit_publishes_moved_wire() {
        let mut engine = WireEngine::default();
        engine
            .connect_points(p(0.0, 0.0), p(10.0, 0.0), RouteStrategy::default())
            .unwrap();
        let edge = engine.find_edge_at(p(5.0, 0.0)).unwrap();
        let mut session = engine.begin_drag(&DragSelection::edges([edge])).unwrap();
        session.update(p(0.0, 10.0)).unwrap();
        let changes = engine.commit_drag(session).unwrap();
        assert_eq!(changes.moved_vertices.len(), 2);
        assert!(engine.find_vertex_at(p(0.0, 10.0)).is_some());
        assert_eq!(engine.history().undo_description(), Some("Drag"));
    }

    #[test]
    fn test_load_then_sync_places_pins() {
        let owner = Uuid::new_v4();
        let wires = vec![PersistedWire {
            net: None,
            name: None,
            user_named: false,
            segments: vec![WireSegment::new(
                AttachmentPoint::pin(owner, "1"),
                AttachmentPoint::free(30.0, 0.0),
            )],
        }];
        let mut engine = WireEngine::default();
        engine.load(&wires);
        assert!(engine.find_vertex_at(p(0.0, 0.0)).is_none());

        engine
            .sync_pins(
                owner,
                Transform::translate(10.0, 0.0),
                vec![PinDefinition::new("1", 0.0, 0.0)],
            )
            .unwrap();
        let pin = engine.find_vertex_at(p(10.0, 0.0)).expect("placed pin");
        assert!(engine.state().vertex(pin).unwrap().ownership.is_pin());

        let changes = engine.release_pins(owner).unwrap();
        assert_eq!(changes.reowned_vertices, vec![pin]);
        assert_eq!(engine.state().vertex(pin).unwrap().ownership, Ownership::Free);
        assert_eq!(engine.history().undo_description(), Some("Release pins"));
    }

    #[test]
    fn test_crossing_connect_keeps_user_net_name() {
        let mut engine = WireEngine::default();
        engine
            .connect_points(p(50.0, -20.0), p(50.0, 20.0), RouteStrategy::default())
            .unwrap();
        let vcc = engine.nets_summary()[0].net;
        engine.rename_net(vcc, "VCC").unwrap();
        engine
            .connect_points(p(0.0, 0.0), p(0.0, 10.0), RouteStrategy::default())
            .unwrap();
        engine
            .connect_points(p(100.0, 0.0), p(100.0, 10.0), RouteStrategy::default())
            .unwrap();
        assert_eq!(engine.nets_summary().len(), 3);

        let a = engine.find_vertex_at(p(0.0, 0.0)).unwrap();
        let b = engine.find_vertex_at(p(100.0, 0.0)).unwrap();
        engine.connect(a, b, RouteStrategy::default()).unwrap();

        let nets = engine.nets_summary();
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].name, "VCC");
        let junction = engine.find_vertex_at(p(50.0, 0.0)).expect("junction");
        assert_eq!(engine.state().degree(junction), 4);
    }

    #[test]
    fn test_history_can_be_disabled() {
        let config = EngineConfig {
            record_history: false,
            ..EngineConfig::default()
        };
        let mut engine = WireEngine::new(config);
        engine
            .connect_points(p(0.0, 0.0), p(10.0, 0.0), RouteStrategy::default())
            .unwrap();
        assert!(engine.undo().is_none());
    }
}
