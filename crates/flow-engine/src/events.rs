//! Event types for streaming run progress
//!
//! Events are sent from the execution engine and the run queue to the
//! editor (or any consumer) to report queueing, per-node progress and the
//! terminal outcome of each run.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::execution::{ProfitSummary, RunState};
use crate::types::{NodeId, RunId, WorkflowId};

/// Where the engine and the run queue report progress
///
/// Implementations must not block; the engine calls `send` inline between
/// node executions.
pub trait EventSink: Send + Sync {
    fn send(&self, event: RunEvent) -> Result<(), EventError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event receiver dropped")]
    ReceiverDropped,
}

/// Events emitted while runs are queued and executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    /// A run was created and placed on the queue
    #[serde(rename_all = "camelCase")]
    RunQueued {
        run_id: RunId,
        workflow_id: WorkflowId,
    },

    /// The worker dequeued a run and started executing it
    #[serde(rename_all = "camelCase")]
    RunStarted {
        run_id: RunId,
        workflow_id: WorkflowId,
    },

    /// A node started executing
    #[serde(rename_all = "camelCase")]
    NodeStarted { run_id: RunId, node_id: NodeId },

    /// A node completed successfully
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        run_id: RunId,
        node_id: NodeId,
        output: Option<serde_json::Value>,
    },

    /// A node failed; the run stops after this event
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        run_id: RunId,
        node_id: NodeId,
        error: String,
    },

    /// A node was never reached
    #[serde(rename_all = "camelCase")]
    NodeSkipped { run_id: RunId, node_id: NodeId },

    /// The run reached a terminal state
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        run_id: RunId,
        workflow_id: WorkflowId,
        state: RunState,
        profit: ProfitSummary,
        error: Option<String>,
    },
}

impl RunEvent {
    /// The run this event belongs to
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::RunQueued { run_id, .. }
            | RunEvent::RunStarted { run_id, .. }
            | RunEvent::NodeStarted { run_id, .. }
            | RunEvent::NodeCompleted { run_id, .. }
            | RunEvent::NodeFailed { run_id, .. }
            | RunEvent::NodeSkipped { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. } => run_id,
        }
    }

    /// Whether this is the last event of its run
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::RunCompleted { .. })
    }
}

/// Drops every event
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: RunEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<RunEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().clone()
    }

    /// Events of one run only
    pub fn events_for(&self, run_id: &str) -> Vec<RunEvent> {
        self.lock()
            .iter()
            .filter(|e| e.run_id() == run_id)
            .cloned()
            .collect()
    }

    /// Remove and return everything collected so far
    pub fn drain(&self) -> Vec<RunEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RunEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: RunEvent) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

/// Forwards events into an unbounded tokio channel
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelEventSink {
    /// Create a sink together with the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn send(&self, event: RunEvent) -> Result<(), EventError> {
        self.sender
            .send(event)
            .map_err(|_| EventError::ReceiverDropped)
    }
}
