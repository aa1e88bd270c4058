//! Flow Engine - visual trading workflow core
//!
//! This crate provides the model and engines behind a node-based trading
//! workflow editor. It supports:
//!
//! - A component registry of typed trading components (listeners, an AI
//!   evaluator, trade executors, result collectors, flow start/end)
//! - A workflow graph model with connection validation
//! - A canvas interaction engine for pan/zoom/drag/connect gestures
//! - An execution engine with topological ordering, per-node status and
//!   logs, fail-fast semantics and profit aggregation
//! - A FIFO single-worker run queue and a JSON-file backed store
//! - Compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! - `ComponentRegistry`: schemas collected at link time via `inventory`
//! - `EditorSession`: the UI command surface over canvas, graph and history
//! - `ExecutionEngine` + `RunQueue`: run workflows against `NodeServices`
//! - `EventSink`: generic event streaming (not tied to any UI toolkit)
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::{ComponentType, WorkflowBuilder};
//!
//! let workflow = WorkflowBuilder::new("wf-1", "Momentum")
//!     .add_node("start", ComponentType::Start, (0.0, 0.0))
//!     .add_node("price", ComponentType::PriceListener, (250.0, 0.0))
//!     .add_node("end", ComponentType::End, (500.0, 0.0))
//!     .connect("start", "price")
//!     .connect("price", "end")
//!     .build();
//! ```

pub mod builder;
pub mod canvas;
pub mod components;
pub mod config;
pub mod editor;
pub mod error;
pub mod events;
pub mod execution;
pub mod graph;
pub mod registry;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use canvas::{
    CanvasEngine, CanvasOutcome, DragMode, PointerButton, PointerEvent, Touch, Viewport,
};
pub use components::NodeConfig;
pub use config::{CanvasConfig, ExecutionConfig, FlowConfig, HistoryConfig, StoreConfig};
pub use editor::EditorSession;
pub use error::{FlowEngineError, Result};
pub use events::{ChannelEventSink, EventSink, NullEventSink, RunEvent, VecEventSink};
pub use execution::{
    CollectorService, EvaluatorService, ExecutionEngine, ExecutorService, ListenerService,
    ListenerSource, NodeInputs, NodeServices, OrderingPolicy, ProfitSummary, RunQueue, RunState,
    RunTicket, ServiceResult, WorkflowRun,
};
pub use graph::{Connection, Node, Workflow};
pub use registry::{ComponentRegistry, ComponentSchema, SchemaFn};
pub use store::{JsonStore, WorkflowStore};
pub use types::{
    ComponentCategory, ComponentType, NodeRunStatus, NodeStatus, PortMode, Position, RunType,
    WorkflowStatus,
};
pub use undo::UndoStack;
pub use validation::{can_connect, validate_workflow, ConnectionRejection, ValidationError};
