//! Canvas gesture state machine
//!
//! Every transition starts from `DragMode::Idle`. Pointer moves and
//! releases only act inside the mode that is currently active, and a
//! pointer-down while a drag is in progress is ignored.

use crate::canvas::gesture::{
    CanvasOutcome, DragMode, HitTarget, PointerButton, PointerEvent, Touch,
};
use crate::canvas::viewport::Viewport;
use crate::config::CanvasConfig;
use crate::error::{FlowEngineError, Result};
use crate::graph::{Node, Workflow};
use crate::registry::ComponentRegistry;
use crate::types::{ComponentType, NodeId, Position, OUTPUT_PORT};
use crate::validation::check_connection;

/// Pan/zoom transform, drag state and selection of one canvas
#[derive(Debug, Clone)]
pub struct CanvasEngine {
    config: CanvasConfig,
    viewport: Viewport,
    mode: DragMode,
    selection: Option<NodeId>,
}

impl CanvasEngine {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            viewport: Viewport::new(&config),
            config,
            mode: DragMode::Idle,
            selection: None,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn mode(&self) -> &DragMode {
        &self.mode
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn select(&mut self, node_id: Option<NodeId>) {
        self.selection = node_id;
    }

    /// Forget a node that no longer exists
    pub fn forget_node(&mut self, node_id: &str) {
        if self.selection.as_deref() == Some(node_id) {
            self.selection = None;
        }
        let involved = match &self.mode {
            DragMode::DraggingNode { node_id: id, .. } => id == node_id,
            DragMode::Connecting { source, .. } => source == node_id,
            _ => false,
        };
        if involved {
            self.mode = DragMode::Idle;
        }
    }

    // ---- geometry ----

    fn input_port(&self, node: &Node) -> Position {
        node.position.offset(0.0, self.config.node_height / 2.0)
    }

    fn output_port(&self, node: &Node) -> Position {
        node.position
            .offset(self.config.node_width, self.config.node_height / 2.0)
    }

    fn contains(&self, node: &Node, point: Position) -> bool {
        point.x >= node.position.x
            && point.x <= node.position.x + self.config.node_width
            && point.y >= node.position.y
            && point.y <= node.position.y + self.config.node_height
    }

    /// What lies under a screen-space point.
    ///
    /// Ports win over node bodies; among overlapping nodes the last one
    /// (drawn on top) wins. Ports a component type does not have are not hit.
    pub fn hit_test(
        &self,
        workflow: &Workflow,
        registry: &ComponentRegistry,
        screen: Position,
    ) -> HitTarget {
        let point = self.viewport.screen_to_graph(screen);
        let radius = self.config.port_radius;

        for node in workflow.nodes.iter().rev() {
            let Ok(schema) = registry.get_schema(node.component_type()) else {
                continue;
            };
            if schema.has_output() && self.output_port(node).distance_to(&point) <= radius {
                return HitTarget::OutputPort(node.id.clone());
            }
            if schema.has_input() && self.input_port(node).distance_to(&point) <= radius {
                return HitTarget::InputPort(node.id.clone());
            }
        }

        workflow
            .nodes
            .iter()
            .rev()
            .find(|node| self.contains(node, point))
            .map(|node| HitTarget::Node(node.id.clone()))
            .unwrap_or(HitTarget::Background)
    }

    // ---- pointer ----

    pub fn pointer_down(
        &mut self,
        workflow: &Workflow,
        registry: &ComponentRegistry,
        event: PointerEvent,
    ) -> CanvasOutcome {
        if !self.mode.is_idle() {
            return CanvasOutcome::Nothing;
        }

        if event.button != PointerButton::Primary {
            self.mode = DragMode::Panning {
                last: event.position,
            };
            return CanvasOutcome::Nothing;
        }

        let point = self.viewport.screen_to_graph(event.position);
        match self.hit_test(workflow, registry, event.position) {
            HitTarget::OutputPort(source) => {
                log::debug!("Start connecting from '{}'", source);
                self.mode = DragMode::Connecting {
                    source,
                    port: OUTPUT_PORT.to_string(),
                    pointer: point,
                };
                CanvasOutcome::Nothing
            }
            HitTarget::Node(node_id) | HitTarget::InputPort(node_id) => {
                let Some(node) = workflow.find_node(&node_id) else {
                    return CanvasOutcome::Nothing;
                };
                let offset = Position::new(point.x - node.position.x, point.y - node.position.y);
                self.mode = DragMode::DraggingNode {
                    node_id: node_id.clone(),
                    offset,
                    origin: node.position,
                };
                self.selection = Some(node_id.clone());
                CanvasOutcome::SelectionChanged(Some(node_id))
            }
            HitTarget::Background => {
                if self.selection.take().is_some() {
                    CanvasOutcome::SelectionChanged(None)
                } else {
                    CanvasOutcome::Nothing
                }
            }
        }
    }

    pub fn pointer_move(&mut self, workflow: &mut Workflow, screen: Position) -> CanvasOutcome {
        let point = self.viewport.screen_to_graph(screen);
        match &mut self.mode {
            DragMode::DraggingNode { node_id, offset, .. } => {
                let position = Position::new(point.x - offset.x, point.y - offset.y);
                if workflow.move_node(node_id, position) {
                    CanvasOutcome::NodeMoved {
                        node_id: node_id.clone(),
                        position,
                    }
                } else {
                    CanvasOutcome::Nothing
                }
            }
            DragMode::Panning { last } => {
                let (dx, dy) = (screen.x - last.x, screen.y - last.y);
                *last = screen;
                self.viewport.pan_by(dx, dy);
                CanvasOutcome::ViewportChanged
            }
            DragMode::Connecting { pointer, .. } => {
                *pointer = point;
                CanvasOutcome::Nothing
            }
            DragMode::Idle | DragMode::ThreeFingerPanning { .. } => CanvasOutcome::Nothing,
        }
    }

    pub fn pointer_up(
        &mut self,
        workflow: &mut Workflow,
        registry: &ComponentRegistry,
        screen: Position,
    ) -> CanvasOutcome {
        if matches!(self.mode, DragMode::ThreeFingerPanning { .. }) {
            return CanvasOutcome::Nothing;
        }

        match std::mem::take(&mut self.mode) {
            DragMode::DraggingNode { node_id, origin, .. } => drop_node(workflow, node_id, origin),
            DragMode::Connecting { source, .. } => {
                let HitTarget::InputPort(target) = self.hit_test(workflow, registry, screen) else {
                    log::debug!("Connection from '{}' dropped on nothing", source);
                    return CanvasOutcome::Nothing;
                };
                match workflow.connect(registry, &source, &target) {
                    Ok(connection_id) => CanvasOutcome::ConnectionCreated {
                        connection_id,
                        source,
                        target,
                    },
                    Err(FlowEngineError::InvalidConnection(reason)) => {
                        log::debug!("Rejected connection {} -> {}: {}", source, target, reason);
                        CanvasOutcome::ConnectionRejected(reason)
                    }
                    Err(e) => {
                        log::warn!("Connection {} -> {} failed: {}", source, target, e);
                        CanvasOutcome::Nothing
                    }
                }
            }
            DragMode::Panning { .. } | DragMode::Idle | DragMode::ThreeFingerPanning { .. } => {
                CanvasOutcome::Nothing
            }
        }
    }

    /// Pointer left the canvas; any pointer drag ends where it is
    pub fn pointer_leave(&mut self, workflow: &Workflow) -> CanvasOutcome {
        if matches!(self.mode, DragMode::ThreeFingerPanning { .. }) {
            return CanvasOutcome::Nothing;
        }
        match std::mem::take(&mut self.mode) {
            DragMode::DraggingNode { node_id, origin, .. } => drop_node(workflow, node_id, origin),
            _ => CanvasOutcome::Nothing,
        }
    }

    // ---- touch ----

    pub fn touch_start(&mut self, touches: &[Touch]) -> CanvasOutcome {
        if self.mode.is_idle() && touches.len() == 3 {
            self.mode = DragMode::ThreeFingerPanning {
                touches: touches.to_vec(),
            };
        }
        CanvasOutcome::Nothing
    }

    /// Pan by the averaged per-touch delta while exactly three touches move
    pub fn touch_move(&mut self, touches: &[Touch]) -> CanvasOutcome {
        let DragMode::ThreeFingerPanning { touches: previous } = &mut self.mode else {
            return CanvasOutcome::Nothing;
        };
        if touches.len() != 3 {
            self.mode = DragMode::Idle;
            return CanvasOutcome::Nothing;
        }

        let (mut sum_x, mut sum_y) = (0.0, 0.0);
        for (index, touch) in touches.iter().enumerate() {
            let before = previous
                .iter()
                .find(|t| t.id == touch.id)
                .or_else(|| previous.get(index))
                .map(|t| t.position)
                .unwrap_or(touch.position);
            sum_x += touch.position.x - before.x;
            sum_y += touch.position.y - before.y;
        }
        *previous = touches.to_vec();

        let multiplier = self.config.touch_pan_multiplier;
        let limit = self.config.touch_pan_limit;
        let pan = self.viewport.pan();
        self.viewport.set_pan(Position::new(
            (pan.x + sum_x / 3.0 * multiplier).clamp(-limit, limit),
            (pan.y + sum_y / 3.0 * multiplier).clamp(-limit, limit),
        ));
        CanvasOutcome::ViewportChanged
    }

    /// Touches lifted; `remaining` are the touches still down
    pub fn touch_end(&mut self, remaining: &[Touch]) -> CanvasOutcome {
        if matches!(self.mode, DragMode::ThreeFingerPanning { .. }) && remaining.len() < 3 {
            self.mode = DragMode::Idle;
        }
        CanvasOutcome::Nothing
    }

    // ---- zoom ----

    /// Positive delta zooms out, negative zooms in
    pub fn wheel(&mut self, delta_y: f64) -> CanvasOutcome {
        if delta_y > 0.0 {
            self.viewport.zoom_by(self.config.wheel_zoom_out);
        } else if delta_y < 0.0 {
            self.viewport.zoom_by(self.config.wheel_zoom_in);
        } else {
            return CanvasOutcome::Nothing;
        }
        CanvasOutcome::ViewportChanged
    }

    pub fn zoom_in(&mut self) -> CanvasOutcome {
        self.viewport.zoom_by(self.config.toolbar_zoom_step);
        CanvasOutcome::ViewportChanged
    }

    pub fn zoom_out(&mut self) -> CanvasOutcome {
        self.viewport.zoom_by(1.0 / self.config.toolbar_zoom_step);
        CanvasOutcome::ViewportChanged
    }

    pub fn reset_zoom(&mut self) -> CanvasOutcome {
        self.viewport.reset();
        CanvasOutcome::ViewportChanged
    }

    // ---- queries and palette ----

    /// Node ids whose input would accept the edge currently being dragged
    pub fn compatible_targets(
        &self,
        workflow: &Workflow,
        registry: &ComponentRegistry,
    ) -> Vec<NodeId> {
        let DragMode::Connecting { source, .. } = &self.mode else {
            return Vec::new();
        };
        workflow
            .nodes
            .iter()
            .filter(|node| check_connection(workflow, registry, source, &node.id).is_ok())
            .map(|node| node.id.clone())
            .collect()
    }

    /// Drop a palette component at the graph point under `screen`
    pub fn add_node_at(
        &mut self,
        workflow: &mut Workflow,
        registry: &ComponentRegistry,
        component_type: ComponentType,
        screen: Position,
    ) -> Result<NodeId> {
        let position = self.viewport.screen_to_graph(screen);
        let node_id = workflow.add_node(registry, component_type, position)?;
        self.selection = Some(node_id.clone());
        Ok(node_id)
    }
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

/// End of a node drag; a node that never left its origin was only clicked
fn drop_node(workflow: &Workflow, node_id: NodeId, origin: Position) -> CanvasOutcome {
    match workflow.find_node(&node_id) {
        Some(node) if node.position != origin => CanvasOutcome::NodeDropped {
            position: node.position,
            node_id,
        },
        _ => CanvasOutcome::Nothing,
    }
}
