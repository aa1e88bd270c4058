//! Input events, drag modes and gesture outcomes

use crate::types::{ConnectionId, NodeId, Position};
use crate::validation::ConnectionRejection;

/// Mouse button that produced a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// A pointer event in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Position,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            position: Position::new(x, y),
            button: PointerButton::Primary,
        }
    }

    pub fn secondary(x: f64, y: f64) -> Self {
        Self {
            position: Position::new(x, y),
            button: PointerButton::Secondary,
        }
    }
}

/// One active touch point in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub id: u64,
    pub position: Position,
}

impl Touch {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Position::new(x, y),
        }
    }
}

/// What lies under a point on the canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    OutputPort(NodeId),
    InputPort(NodeId),
    Node(NodeId),
    Background,
}

/// The active drag state; exactly one at a time
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragMode {
    #[default]
    Idle,
    /// Moving a node; `offset` is pointer minus node origin in graph space,
    /// `origin` the node position when the drag began
    DraggingNode {
        node_id: NodeId,
        offset: Position,
        origin: Position,
    },
    /// Panning the viewport; `last` is the previous pointer in screen space
    Panning { last: Position },
    /// Dragging a new edge; `pointer` is the live endpoint in graph space
    Connecting {
        source: NodeId,
        port: String,
        pointer: Position,
    },
    /// Three touches moving together
    ThreeFingerPanning { touches: Vec<Touch> },
}

impl DragMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragMode::Idle)
    }
}

/// Effect of a gesture handler on the workflow or the view
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOutcome {
    Nothing,
    /// Node position changed during a drag
    NodeMoved { node_id: NodeId, position: Position },
    /// Node drag finished at its final position
    NodeDropped { node_id: NodeId, position: Position },
    ConnectionCreated {
        connection_id: ConnectionId,
        source: NodeId,
        target: NodeId,
    },
    ConnectionRejected(ConnectionRejection),
    ViewportChanged,
    SelectionChanged(Option<NodeId>),
}

impl CanvasOutcome {
    /// Whether the outcome ends an edit the workflow should remember
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            CanvasOutcome::NodeDropped { .. } | CanvasOutcome::ConnectionCreated { .. }
        )
    }
}
