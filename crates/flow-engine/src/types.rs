//! Core types shared by the graph model, canvas and execution engine
//!
//! Component types, categories, port arity and the status enums that
//! nodes, workflows and runs move through.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FlowEngineError;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for a connection
pub type ConnectionId = String;

/// Unique identifier for a workflow
pub type WorkflowId = String;

/// Unique identifier for a workflow run
pub type RunId = String;

/// Port identifier of the single output port every node exposes
pub const OUTPUT_PORT: &str = "output";

/// Port identifier of the single input port every node exposes
pub const INPUT_PORT: &str = "input";

/// The kind of trading component a node instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    /// Flow entry point
    Start,
    /// Market price feed
    PriceListener,
    /// On-chain wallet balance feed
    WalletListener,
    /// AI strategy evaluator
    AiEvaluator,
    /// Trade submission
    TradeExecutor,
    /// Position monitor and result reporter
    ResultCollector,
    /// Flow exit point
    End,
}

impl ComponentType {
    /// Every built-in component type, in palette order
    pub const ALL: [ComponentType; 7] = [
        ComponentType::Start,
        ComponentType::PriceListener,
        ComponentType::WalletListener,
        ComponentType::AiEvaluator,
        ComponentType::TradeExecutor,
        ComponentType::ResultCollector,
        ComponentType::End,
    ];

    /// The type id used in persisted documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Start => "start",
            ComponentType::PriceListener => "price-listener",
            ComponentType::WalletListener => "wallet-listener",
            ComponentType::AiEvaluator => "ai-evaluator",
            ComponentType::TradeExecutor => "trade-executor",
            ComponentType::ResultCollector => "result-collector",
            ComponentType::End => "end",
        }
    }

    /// Coarse category used for dispatch and ordering
    pub fn category(&self) -> ComponentCategory {
        match self {
            ComponentType::Start | ComponentType::End => ComponentCategory::Flow,
            ComponentType::PriceListener | ComponentType::WalletListener => {
                ComponentCategory::Listener
            }
            ComponentType::AiEvaluator => ComponentCategory::Evaluator,
            ComponentType::TradeExecutor => ComponentCategory::Executor,
            ComponentType::ResultCollector => ComponentCategory::Collector,
        }
    }

    /// Rank used to order nodes by category.
    ///
    /// Start sorts before listeners and End after collectors.
    pub fn category_rank(&self) -> u8 {
        match self {
            ComponentType::Start => 0,
            ComponentType::PriceListener | ComponentType::WalletListener => 1,
            ComponentType::AiEvaluator => 2,
            ComponentType::TradeExecutor => 3,
            ComponentType::ResultCollector => 4,
            ComponentType::End => 5,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = FlowEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FlowEngineError::UnknownType(s.to_string()))
    }
}

/// Category of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    /// Start and End
    Flow,
    /// Data feeds
    Listener,
    /// AI evaluation
    Evaluator,
    /// Trade execution
    Executor,
    /// Result monitoring
    Collector,
}

impl ComponentCategory {
    /// Palette order of categories
    pub const ORDER: [ComponentCategory; 5] = [
        ComponentCategory::Flow,
        ComponentCategory::Listener,
        ComponentCategory::Evaluator,
        ComponentCategory::Executor,
        ComponentCategory::Collector,
    ];
}

/// Arity of a node's input or output port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortMode {
    /// At most one connection
    Single,
    /// Any number of connections
    Multi,
}

/// A point in graph or screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Design-time preview status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

/// Status of a node within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRunStatus {
    Queued,
    Running,
    Success,
    Failed,
    /// Never reached because the run stopped earlier
    Skipped,
}

impl From<NodeRunStatus> for NodeStatus {
    fn from(status: NodeRunStatus) -> Self {
        match status {
            NodeRunStatus::Queued | NodeRunStatus::Skipped => NodeStatus::Idle,
            NodeRunStatus::Running => NodeStatus::Running,
            NodeRunStatus::Success => NodeStatus::Success,
            NodeRunStatus::Failed => NodeStatus::Error,
        }
    }
}

/// Severity of a node log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One line of a node's execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// How a run was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    #[default]
    Manual,
    Scheduled,
}

/// Lifecycle status of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Running,
    Paused,
    Completed,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_type_round_trip_through_str() {
        for t in ComponentType::ALL {
            let parsed: ComponentType = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
        }
    }

    #[test]
    fn test_unknown_component_type() {
        let err = "margin-executor".parse::<ComponentType>().unwrap_err();
        assert!(matches!(err, FlowEngineError::UnknownType(ref t) if t == "margin-executor"));
    }

    #[test]
    fn test_component_type_serializes_as_type_id() {
        let json = serde_json::to_string(&ComponentType::AiEvaluator).unwrap();
        assert_eq!(json, "\"ai-evaluator\"");
    }

    #[test]
    fn test_category_rank_follows_pipeline() {
        let rank = |t: ComponentType| t.category_rank();
        assert!(rank(ComponentType::Start) < rank(ComponentType::PriceListener));
        assert!(rank(ComponentType::AiEvaluator) < rank(ComponentType::TradeExecutor));
        assert!(rank(ComponentType::ResultCollector) < rank(ComponentType::End));
    }
}
