//! Workflow execution
//!
//! - `order`: execution ordering (topological with category tie-break)
//! - `services`: traits for the external listener, evaluator, executor and
//!   collector services
//! - `run`: run records, per-node state and profit summary
//! - `engine`: executes one run against a workflow snapshot
//! - `queue`: FIFO single-worker queue in front of the engine

pub mod engine;
pub mod order;
pub mod queue;
pub mod run;
pub mod services;

pub use engine::ExecutionEngine;
pub use order::{execution_order, OrderingPolicy};
pub use queue::{RunQueue, RunTicket};
pub use run::{NodeRunState, ProfitSummary, RunState, RunStateUpdate, WorkflowRun};
pub use services::{
    CollectorService, EvaluatorService, ExecutorService, ListenerService, ListenerSource,
    NodeInputs, NodeServices, ServiceResult,
};
