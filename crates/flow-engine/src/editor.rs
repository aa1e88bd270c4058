//! Editor session
//!
//! Owns the workflow being edited, its canvas and its undo history, and
//! exposes the commands a UI issues: palette add, delete, configuration
//! edits, gestures, zoom, undo/redo, save and run. Every completed edit
//! pushes one undo snapshot.

use std::sync::Arc;

use crate::canvas::{CanvasEngine, CanvasOutcome, PointerEvent, Touch};
use crate::components::NodeConfig;
use crate::config::FlowConfig;
use crate::error::{FlowEngineError, Result};
use crate::execution::{RunQueue, RunTicket, WorkflowRun};
use crate::graph::{Connection, Workflow};
use crate::registry::{ComponentRegistry, ComponentSchema};
use crate::store::WorkflowStore;
use crate::types::{
    ComponentCategory, ComponentType, NodeId, Position, RunType, WorkflowId, WorkflowStatus,
};
use crate::undo::{UndoStack, OPENED};
use crate::validation::{validate_workflow, ValidationError};

/// Editing state for one open workflow
pub struct EditorSession {
    workflow: Workflow,
    registry: Arc<ComponentRegistry>,
    canvas: CanvasEngine,
    history: UndoStack,
}

impl EditorSession {
    /// Open a workflow for editing
    pub fn new(
        workflow: Workflow,
        registry: Arc<ComponentRegistry>,
        config: &FlowConfig,
    ) -> Result<Self> {
        let mut canvas = CanvasEngine::new(config.canvas);
        canvas.viewport_mut().restore(&workflow.viewport);

        let mut history =
            UndoStack::with_level(config.history.limit, config.history.compression_level);
        history.record(OPENED, &workflow)?;
        history.mark_saved();

        Ok(Self {
            workflow,
            registry,
            canvas,
            history,
        })
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn canvas(&self) -> &CanvasEngine {
        &self.canvas
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Whether there are edits since the last save
    pub fn is_dirty(&self) -> bool {
        !self.history.is_at_saved()
    }

    pub fn palette(&self) -> Vec<(ComponentCategory, Vec<&ComponentSchema>)> {
        self.registry.palette()
    }

    fn record_edit(&mut self, label: &str) -> Result<()> {
        self.history.record(label, &self.workflow)
    }

    fn record_outcome(&mut self, outcome: CanvasOutcome) -> CanvasOutcome {
        if outcome.is_edit() {
            let label = match outcome {
                CanvasOutcome::ConnectionCreated { .. } => "connect",
                _ => "move node",
            };
            if let Err(e) = self.record_edit(label) {
                log::warn!("Failed to record undo snapshot: {}", e);
            }
        }
        outcome
    }

    // ---- commands ----

    /// Drop a component from the palette at a screen point
    pub fn add_node(&mut self, component_type: ComponentType, screen: Position) -> Result<NodeId> {
        let node_id = self
            .canvas
            .add_node_at(&mut self.workflow, &self.registry, component_type, screen)?;
        self.record_edit("add node")?;
        Ok(node_id)
    }

    /// Delete a node and its connections
    pub fn delete_node(&mut self, node_id: &str) -> Result<Vec<Connection>> {
        let (_, removed) = self
            .workflow
            .remove_node(node_id)
            .ok_or_else(|| FlowEngineError::not_found(format!("node '{}'", node_id)))?;
        self.canvas.forget_node(node_id);
        self.record_edit("delete node")?;
        Ok(removed)
    }

    /// Delete the selected node, if any
    pub fn delete_selected(&mut self) -> Result<bool> {
        match self.canvas.selection().map(str::to_string) {
            Some(node_id) => self.delete_node(&node_id).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn delete_connection(&mut self, connection_id: &str) -> Result<Connection> {
        let connection = self
            .workflow
            .remove_connection(connection_id)
            .ok_or_else(|| FlowEngineError::not_found(format!("connection '{}'", connection_id)))?;
        self.record_edit("delete connection")?;
        Ok(connection)
    }

    pub fn update_config(&mut self, node_id: &str, config: NodeConfig) -> Result<()> {
        self.workflow.update_config(node_id, config)?;
        self.record_edit("edit config")
    }

    /// Apply a configuration map from a form; missing keys take defaults
    pub fn update_config_value(&mut self, node_id: &str, value: serde_json::Value) -> Result<()> {
        let component_type = self
            .workflow
            .find_node(node_id)
            .map(|n| n.component_type())
            .ok_or_else(|| FlowEngineError::not_found(format!("node '{}'", node_id)))?;
        let config = NodeConfig::from_value(component_type, value)?;
        self.update_config(node_id, config)
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        self.workflow.name = name.into();
        self.workflow.touch();
        self.record_edit("rename")
    }

    // ---- gestures ----

    pub fn pointer_down(&mut self, event: PointerEvent) -> CanvasOutcome {
        self.canvas.pointer_down(&self.workflow, &self.registry, event)
    }

    pub fn pointer_move(&mut self, screen: Position) -> CanvasOutcome {
        self.canvas.pointer_move(&mut self.workflow, screen)
    }

    pub fn pointer_up(&mut self, screen: Position) -> CanvasOutcome {
        let outcome = self
            .canvas
            .pointer_up(&mut self.workflow, &self.registry, screen);
        self.record_outcome(outcome)
    }

    pub fn pointer_leave(&mut self) -> CanvasOutcome {
        let outcome = self.canvas.pointer_leave(&self.workflow);
        self.record_outcome(outcome)
    }

    pub fn touch_start(&mut self, touches: &[Touch]) -> CanvasOutcome {
        self.canvas.touch_start(touches)
    }

    pub fn touch_move(&mut self, touches: &[Touch]) -> CanvasOutcome {
        self.canvas.touch_move(touches)
    }

    pub fn touch_end(&mut self, remaining: &[Touch]) -> CanvasOutcome {
        self.canvas.touch_end(remaining)
    }

    pub fn wheel(&mut self, delta_y: f64) -> CanvasOutcome {
        self.canvas.wheel(delta_y)
    }

    pub fn zoom_in(&mut self) -> CanvasOutcome {
        self.canvas.zoom_in()
    }

    pub fn zoom_out(&mut self) -> CanvasOutcome {
        self.canvas.zoom_out()
    }

    pub fn reset_zoom(&mut self) -> CanvasOutcome {
        self.canvas.reset_zoom()
    }

    /// Node ids that would accept the edge being dragged
    pub fn compatible_targets(&self) -> Vec<NodeId> {
        self.canvas.compatible_targets(&self.workflow, &self.registry)
    }

    // ---- history ----

    /// Returns false when there is nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns false when there is nothing to redo
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Name of the edit `undo` would revert
    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    fn restore(&mut self, workflow: Workflow) {
        if let Some(selected) = self.canvas.selection().map(str::to_string) {
            if !workflow.contains_node(&selected) {
                self.canvas.forget_node(&selected);
            }
        }
        // Snapshots taken before the first save carry no id
        let id = std::mem::take(&mut self.workflow.id);
        self.workflow = workflow;
        if !id.is_empty() {
            self.workflow.id = id;
        }
    }

    // ---- validation, persistence, runs ----

    pub fn validate(&self) -> Vec<ValidationError> {
        validate_workflow(&self.workflow, &self.registry)
    }

    /// Save the workflow together with the current viewport
    pub async fn save(&mut self, store: &dyn WorkflowStore) -> Result<WorkflowId> {
        self.workflow.viewport = self.canvas.viewport().to_saved();
        let saved = store.save_workflow(self.workflow.clone()).await?;
        self.workflow.id = saved.id.clone();
        self.workflow.updated_at = saved.updated_at;
        self.history.mark_saved();
        Ok(saved.id)
    }

    /// Save, then queue a manual run of the saved workflow
    pub async fn run(
        &mut self,
        store: &dyn WorkflowStore,
        queue: &RunQueue,
        params: serde_json::Value,
    ) -> Result<RunTicket> {
        let problems = self.validate();
        if !problems.is_empty() {
            log::warn!(
                "Running workflow '{}' with {} validation problem(s)",
                self.workflow.name,
                problems.len()
            );
        }
        let workflow_id = self.save(store).await?;
        let ticket = queue.enqueue(&workflow_id, params, RunType::Manual).await?;
        self.workflow.status = WorkflowStatus::Running;
        Ok(ticket)
    }

    /// The workflow with a run's node states overlaid, for read-only replay.
    ///
    /// The edited workflow takes over the run's lifecycle status.
    pub fn replay(&mut self, run: &WorkflowRun) -> Workflow {
        self.workflow.status = run.state.into();
        let mut workflow = self.workflow.clone();
        run.overlay(&mut workflow);
        workflow
    }
}
