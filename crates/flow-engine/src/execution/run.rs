//! Workflow run records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FlowEngineError, Result};
use crate::graph::Workflow;
use crate::types::{LogEntry, NodeId, NodeRunStatus, RunId, RunType, WorkflowId, WorkflowStatus};

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Queued,
    Running,
    Success,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Success | RunState::Failed)
    }
}

impl From<RunState> for WorkflowStatus {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Queued | RunState::Running => WorkflowStatus::Running,
            RunState::Success => WorkflowStatus::Completed,
            RunState::Failed => WorkflowStatus::Error,
        }
    }
}

/// Aggregated profit of a run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfitSummary {
    /// Sum of reported profits, in quote currency
    pub amount: f64,
    /// `amount` relative to the traded notional, in percent
    pub percentage: f64,
}

impl ProfitSummary {
    /// Build a summary; the percentage is 0 when nothing was traded
    pub fn from_totals(amount: f64, notional: f64) -> Self {
        let percentage = if notional > 0.0 {
            amount / notional * 100.0
        } else {
            0.0
        };
        Self { amount, percentage }
    }
}

/// Status and log of one node within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRunState {
    pub status: NodeRunStatus,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl NodeRunState {
    pub fn skipped() -> Self {
        Self {
            status: NodeRunStatus::Skipped,
            logs: Vec::new(),
        }
    }
}

/// One execution of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow_id: WorkflowId,
    pub run_type: RunType,
    pub state: RunState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profit: ProfitSummary,
    #[serde(default)]
    pub node_states: BTreeMap<NodeId, NodeRunState>,
    /// Parameters handed to the Start node
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowRun {
    /// Create a queued run
    pub fn new(
        workflow_id: impl Into<String>,
        params: serde_json::Value,
        run_type: RunType,
    ) -> Self {
        Self {
            id: format!("run-{}", uuid::Uuid::new_v4()),
            workflow_id: workflow_id.into(),
            run_type,
            state: RunState::Queued,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            profit: ProfitSummary::default(),
            node_states: BTreeMap::new(),
            params,
            error: None,
        }
    }

    pub fn node_status(&self, node_id: &str) -> Option<NodeRunStatus> {
        self.node_states.get(node_id).map(|s| s.status)
    }

    /// Apply a state update.
    ///
    /// A terminal run is immutable; updating one is a persistence error.
    pub fn apply(&mut self, update: RunStateUpdate) -> Result<()> {
        if self.state.is_terminal() {
            return Err(FlowEngineError::persistence(format!(
                "run '{}' is already {:?}",
                self.id, self.state
            )));
        }

        self.state = update.state;
        if update.state == RunState::Running && self.start_time.is_none() {
            self.start_time = Some(Utc::now());
        }
        if let Some(profit) = update.profit {
            self.profit = profit;
        }
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(node_states) = update.node_states {
            self.node_states = node_states;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        Ok(())
    }

    /// Project this run onto a workflow for read-only replay.
    ///
    /// Node preview status and the workflow's lifecycle status follow the
    /// run; nodes the run does not know stay idle.
    pub fn overlay(&self, workflow: &mut Workflow) {
        workflow.clear_run_overlay();
        workflow.status = self.state.into();
        for node in &mut workflow.nodes {
            if let Some(state) = self.node_states.get(&node.id) {
                node.run_status = Some(state.status);
                node.status = state.status.into();
                node.logs = state.logs.clone();
            }
        }
    }
}

/// Partial update of a stored run
#[derive(Debug, Clone, PartialEq)]
pub struct RunStateUpdate {
    pub state: RunState,
    pub profit: Option<ProfitSummary>,
    pub end_time: Option<DateTime<Utc>>,
    pub node_states: Option<BTreeMap<NodeId, NodeRunState>>,
    pub error: Option<String>,
}

impl RunStateUpdate {
    /// Only change the state
    pub fn state(state: RunState) -> Self {
        Self {
            state,
            profit: None,
            end_time: None,
            node_states: None,
            error: None,
        }
    }

    /// Everything the engine produced for a finished run
    pub fn terminal(run: &WorkflowRun) -> Self {
        Self {
            state: run.state,
            profit: Some(run.profit),
            end_time: run.end_time.or_else(|| Some(Utc::now())),
            node_states: Some(run.node_states.clone()),
            error: run.error.clone(),
        }
    }

    /// A run that failed before any node ran
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: RunState::Failed,
            profit: None,
            end_time: Some(Utc::now()),
            node_states: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::types::{ComponentType, NodeStatus};

    #[test]
    fn test_profit_percentage() {
        let summary = ProfitSummary::from_totals(14.0, 200.0);
        assert_eq!(summary.amount, 14.0);
        assert!((summary.percentage - 7.0).abs() < 1e-9);

        assert_eq!(ProfitSummary::from_totals(5.0, 0.0).percentage, 0.0);
    }

    #[test]
    fn test_terminal_run_is_immutable() {
        let mut run = WorkflowRun::new("wf", serde_json::Value::Null, RunType::Manual);
        run.apply(RunStateUpdate::state(RunState::Running)).unwrap();
        assert!(run.start_time.is_some());

        run.apply(RunStateUpdate::failed("boom")).unwrap();
        assert_eq!(run.error.as_deref(), Some("boom"));

        let err = run.apply(RunStateUpdate::state(RunState::Running)).unwrap_err();
        assert!(matches!(err, FlowEngineError::Persistence(_)));
        assert_eq!(run.state, RunState::Failed);
    }

    #[test]
    fn test_overlay_marks_nodes() {
        let mut wf = WorkflowBuilder::new("wf", "Replay")
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .add_node("end", ComponentType::End, (0.0, 0.0))
            .build();
        let mut run = WorkflowRun::new("wf", serde_json::Value::Null, RunType::Manual);
        run.node_states.insert(
            "start".to_string(),
            NodeRunState {
                status: NodeRunStatus::Success,
                logs: vec![LogEntry::info("ok")],
            },
        );
        run.node_states.insert("end".to_string(), NodeRunState::skipped());

        run.state = RunState::Failed;

        run.overlay(&mut wf);
        assert_eq!(wf.status, WorkflowStatus::Error);
        assert_eq!(wf.nodes[0].run_status, Some(NodeRunStatus::Success));
        assert_eq!(wf.nodes[0].status, NodeStatus::Success);
        assert_eq!(wf.nodes[0].logs.len(), 1);
        assert_eq!(wf.nodes[1].run_status, Some(NodeRunStatus::Skipped));
        assert_eq!(wf.nodes[1].status, NodeStatus::Idle);
    }

    #[test]
    fn test_run_document_shape() {
        let params = serde_json::json!({"symbol": "SOL/USDC"});
        let run = WorkflowRun::new("wf", params, RunType::Scheduled);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["workflowId"], "wf");
        assert_eq!(json["runType"], "scheduled");
        assert_eq!(json["state"], "queued");

        let restored: WorkflowRun = serde_json::from_value(json).unwrap();
        assert_eq!(restored, run);
    }
}
