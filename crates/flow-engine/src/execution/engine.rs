//! Workflow execution engine
//!
//! Runs one workflow snapshot node by node in execution order, dispatching
//! each node to its service and recording status and logs per node. The
//! first failing node stops the run; nodes never reached stay `skipped`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;

use crate::components::NodeConfig;
use crate::config::ExecutionConfig;
use crate::error::FlowEngineError;
use crate::events::{EventSink, NullEventSink, RunEvent};
use crate::execution::order::{execution_order, OrderingPolicy};
use crate::execution::run::{NodeRunState, ProfitSummary, RunState, WorkflowRun};
use crate::execution::services::{ListenerSource, NodeInputs, NodeServices};
use crate::graph::{Node, Workflow};
use crate::types::{ComponentCategory, LogEntry, NodeId, NodeRunStatus};

/// Executes workflow runs against a set of node services
#[derive(Clone)]
pub struct ExecutionEngine {
    services: NodeServices,
    ordering: OrderingPolicy,
    event_sink: Arc<dyn EventSink>,
}

impl ExecutionEngine {
    pub fn new(services: NodeServices) -> Self {
        Self {
            services,
            ordering: OrderingPolicy::default(),
            event_sink: Arc::new(NullEventSink),
        }
    }

    /// Engine with the settings of the `execution` config section
    pub fn from_config(services: NodeServices, config: &ExecutionConfig) -> Self {
        Self::new(services).with_ordering(config.ordering)
    }

    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn ordering(&self) -> OrderingPolicy {
        self.ordering
    }

    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.event_sink)
    }

    /// Execute a run to a terminal state.
    ///
    /// Node failures and cycles become run state; this never returns an
    /// error.
    pub async fn execute(&self, workflow: &Workflow, mut run: WorkflowRun) -> WorkflowRun {
        let started = Instant::now();
        run.state = RunState::Running;
        if run.start_time.is_none() {
            run.start_time = Some(Utc::now());
        }
        run.node_states = workflow
            .nodes
            .iter()
            .map(|n| (n.id.clone(), NodeRunState::skipped()))
            .collect();

        self.emit(RunEvent::RunStarted {
            run_id: run.id.clone(),
            workflow_id: run.workflow_id.clone(),
        });
        log::info!("Run '{}' started for workflow '{}'", run.id, workflow.id);

        let order = match execution_order(workflow, self.ordering) {
            Ok(order) => order,
            Err(e) => {
                run.error = Some(e.to_string());
                return self.finish(workflow, run, ProfitSummary::default(), started);
            }
        };

        let mut results: HashMap<NodeId, Value> = HashMap::new();
        let mut profit = 0.0;
        let mut notional = 0.0;

        for node_id in &order {
            let Some(node) = workflow.find_node(node_id) else {
                continue;
            };

            self.emit(RunEvent::NodeStarted {
                run_id: run.id.clone(),
                node_id: node_id.clone(),
            });
            self.update_node(
                &mut run,
                node_id,
                NodeRunStatus::Running,
                LogEntry::info(format!("Starting {}", node.component_type())),
            );

            let inputs: NodeInputs = workflow
                .incoming_connections(node_id)
                .filter_map(|c| results.get(&c.source).map(|v| (c.source.clone(), v.clone())))
                .collect();

            let node_started = Instant::now();
            match self.dispatch(node, &inputs, &run.params).await {
                Ok(data) => {
                    let category = node.component_type().category();
                    if matches!(
                        category,
                        ComponentCategory::Executor | ComponentCategory::Collector
                    ) {
                        profit += data.get("profit").and_then(Value::as_f64).unwrap_or(0.0);
                    }
                    if category == ComponentCategory::Executor {
                        notional += executor_notional(node, &data);
                    }

                    log::debug!("Node '{}' completed in {:?}", node_id, node_started.elapsed());
                    self.update_node(
                        &mut run,
                        node_id,
                        NodeRunStatus::Success,
                        LogEntry::info(format!(
                            "Completed in {}ms",
                            node_started.elapsed().as_millis()
                        )),
                    );
                    self.emit(RunEvent::NodeCompleted {
                        run_id: run.id.clone(),
                        node_id: node_id.clone(),
                        output: Some(data.clone()),
                    });
                    results.insert(node_id.clone(), data);
                }
                Err(message) => {
                    let error = FlowEngineError::NodeExecution {
                        node_id: node_id.clone(),
                        message: message.clone(),
                    };
                    log::warn!("Run '{}': {}", run.id, error);
                    self.update_node(
                        &mut run,
                        node_id,
                        NodeRunStatus::Failed,
                        LogEntry::error(message.clone()),
                    );
                    self.emit(RunEvent::NodeFailed {
                        run_id: run.id.clone(),
                        node_id: node_id.clone(),
                        error: message,
                    });
                    run.error = Some(error.to_string());
                    break;
                }
            }
        }

        self.finish(workflow, run, ProfitSummary::from_totals(profit, notional), started)
    }

    async fn dispatch(
        &self,
        node: &Node,
        inputs: &NodeInputs,
        params: &Value,
    ) -> std::result::Result<Value, String> {
        let result = match node.config() {
            NodeConfig::Start(_) => return Ok(params.clone()),
            NodeConfig::End(_) => {
                return Ok(Value::Object(
                    inputs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                ))
            }
            NodeConfig::PriceListener(config) => {
                self.services
                    .listener
                    .fetch_or_stream(ListenerSource::Price(config))
                    .await
            }
            NodeConfig::WalletListener(config) => {
                self.services
                    .listener
                    .fetch_or_stream(ListenerSource::Wallet(config))
                    .await
            }
            NodeConfig::AiEvaluator(config) => self.services.evaluator.infer(inputs, config).await,
            NodeConfig::TradeExecutor(config) => {
                self.services.executor.submit(inputs, config).await
            }
            NodeConfig::ResultCollector(config) => {
                self.services.collector.monitor(inputs, config).await
            }
        };
        result.into_result()
    }

    fn update_node(
        &self,
        run: &mut WorkflowRun,
        node_id: &str,
        status: NodeRunStatus,
        log: LogEntry,
    ) {
        let state = run
            .node_states
            .entry(node_id.to_string())
            .or_insert_with(NodeRunState::skipped);
        state.status = status;
        state.logs.push(log);
    }

    fn finish(
        &self,
        workflow: &Workflow,
        mut run: WorkflowRun,
        profit: ProfitSummary,
        started: Instant,
    ) -> WorkflowRun {
        for node in &workflow.nodes {
            if run.node_status(&node.id) == Some(NodeRunStatus::Skipped) {
                self.emit(RunEvent::NodeSkipped {
                    run_id: run.id.clone(),
                    node_id: node.id.clone(),
                });
            }
        }

        run.state = if run.error.is_some() {
            RunState::Failed
        } else {
            RunState::Success
        };
        run.profit = profit;
        run.end_time = Some(Utc::now());

        log::info!(
            "Run '{}' finished {:?} in {:?} (profit {:.2}, {:.2}%)",
            run.id,
            run.state,
            started.elapsed(),
            profit.amount,
            profit.percentage
        );
        self.emit(RunEvent::RunCompleted {
            run_id: run.id.clone(),
            workflow_id: run.workflow_id.clone(),
            state: run.state,
            profit,
            error: run.error.clone(),
        });
        run
    }

    fn emit(&self, event: RunEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::debug!("Dropped run event: {}", e);
        }
    }
}

/// Traded notional of an executor: the reported `amount`, else the configured one
fn executor_notional(node: &Node, data: &Value) -> f64 {
    data.get("amount")
        .and_then(Value::as_f64)
        .or(match node.config() {
            NodeConfig::TradeExecutor(config) => Some(config.amount),
            _ => None,
        })
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::components::{AiEvaluatorConfig, ResultCollectorConfig, TradeExecutorConfig};
    use crate::events::VecEventSink;
    use crate::execution::services::{
        CollectorService, EvaluatorService, ExecutorService, ListenerService, ServiceResult,
    };
    use crate::graph::Connection;
    use crate::types::{ComponentType, RunType};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Listener {
        fail: bool,
    }

    #[async_trait]
    impl ListenerService for Listener {
        async fn fetch_or_stream(&self, source: ListenerSource<'_>) -> ServiceResult {
            if self.fail {
                return ServiceResult::error("feed unavailable");
            }
            match source {
                ListenerSource::Price(c) => {
                    ServiceResult::success(json!({"symbol": c.symbol, "price": 100.0}))
                }
                ListenerSource::Wallet(c) => ServiceResult::success(json!({"address": c.address})),
            }
        }
    }

    struct Evaluator;

    #[async_trait]
    impl EvaluatorService for Evaluator {
        async fn infer(&self, inputs: &NodeInputs, _config: &AiEvaluatorConfig) -> ServiceResult {
            ServiceResult::success(json!({"action": "buy", "inputs": inputs.len()}))
        }
    }

    /// Executor that reports the configured amount and no profit
    struct Executor;

    #[async_trait]
    impl ExecutorService for Executor {
        async fn submit(
            &self,
            _strategy: &NodeInputs,
            config: &TradeExecutorConfig,
        ) -> ServiceResult {
            ServiceResult::success(json!({"amount": config.amount}))
        }
    }

    /// Collector replaying scripted profits
    struct Collector {
        profits: Mutex<Vec<f64>>,
    }

    #[async_trait]
    impl CollectorService for Collector {
        async fn monitor(
            &self,
            _tx: &NodeInputs,
            _config: &ResultCollectorConfig,
        ) -> ServiceResult {
            let next = self.profits.lock().unwrap().remove(0);
            ServiceResult::success(json!({"profit": next}))
        }
    }

    fn services(listener_fails: bool, profits: Vec<f64>) -> NodeServices {
        NodeServices::new(
            Arc::new(Listener { fail: listener_fails }),
            Arc::new(Evaluator),
            Arc::new(Executor),
            Arc::new(Collector {
                profits: Mutex::new(profits),
            }),
        )
    }

    fn chain() -> Workflow {
        WorkflowBuilder::new("wf", "Chain")
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (250.0, 0.0))
            .add_node("end", ComponentType::End, (500.0, 0.0))
            .connect("start", "price")
            .connect("price", "end")
            .build()
    }

    fn new_run(params: Value) -> WorkflowRun {
        WorkflowRun::new("wf", params, RunType::Manual)
    }

    #[tokio::test]
    async fn test_chain_success() {
        let engine = ExecutionEngine::new(services(false, vec![]));
        let run = engine.execute(&chain(), new_run(json!({"note": "hi"}))).await;

        assert_eq!(run.state, RunState::Success);
        for id in ["start", "price", "end"] {
            assert_eq!(run.node_status(id), Some(NodeRunStatus::Success), "node {}", id);
            assert_eq!(run.node_states[id].logs.len(), 2);
        }
        assert!(run.end_time.is_some());
        assert!(run.error.is_none());
        assert_eq!(run.profit, ProfitSummary::default());
    }

    fn started_order(sink: &VecEventSink) -> Vec<NodeId> {
        sink.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::NodeStarted { node_id, .. } => Some(node_id),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_configured_ordering_policy() {
        // The evaluator feeds the listener, against category order
        let workflow = WorkflowBuilder::new("wf", "Inverted")
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .add_node("eval", ComponentType::AiEvaluator, (250.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (500.0, 0.0))
            .connect("eval", "price")
            .build();

        let config = ExecutionConfig::default();
        let sink = Arc::new(VecEventSink::new());
        let engine = ExecutionEngine::from_config(services(false, vec![]), &config)
            .with_event_sink(sink.clone());
        assert_eq!(engine.ordering(), OrderingPolicy::Topological);
        let run = engine.execute(&workflow, new_run(Value::Null)).await;
        assert_eq!(run.state, RunState::Success);
        assert_eq!(started_order(&sink), vec!["start", "eval", "price"]);

        let config = ExecutionConfig {
            ordering: OrderingPolicy::CategoryLayered,
        };
        let sink = Arc::new(VecEventSink::new());
        let engine = ExecutionEngine::from_config(services(false, vec![]), &config)
            .with_event_sink(sink.clone());
        let run = engine.execute(&workflow, new_run(Value::Null)).await;
        assert_eq!(run.state, RunState::Success);
        assert_eq!(started_order(&sink), vec!["start", "price", "eval"]);
    }

    #[tokio::test]
    async fn test_failure_stops_run_and_skips_rest() {
        let sink = Arc::new(VecEventSink::new());
        let engine = ExecutionEngine::new(services(true, vec![])).with_event_sink(sink.clone());
        let run = engine.execute(&chain(), new_run(Value::Null)).await;

        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.node_status("start"), Some(NodeRunStatus::Success));
        assert_eq!(run.node_status("price"), Some(NodeRunStatus::Failed));
        assert_eq!(run.node_status("end"), Some(NodeRunStatus::Skipped));
        assert!(run.node_states["end"].logs.is_empty());
        assert!(run.error.as_deref().unwrap().contains("feed unavailable"));

        let events = sink.events();
        assert!(events.contains(&RunEvent::NodeSkipped {
            run_id: run.id.clone(),
            node_id: "end".to_string(),
        }));
        assert!(matches!(
            events.last(),
            Some(RunEvent::RunCompleted { state: RunState::Failed, .. })
        ));
    }

    #[tokio::test]
    async fn test_inputs_flow_along_connections() {
        let engine = ExecutionEngine::new(services(false, vec![]));
        let sink = Arc::new(VecEventSink::new());
        let engine = engine.with_event_sink(sink.clone());
        engine.execute(&chain(), new_run(json!({"seed": 7}))).await;

        let outputs: HashMap<String, Value> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::NodeCompleted { node_id, output, .. } => Some((node_id, output?)),
                _ => None,
            })
            .collect();
        assert_eq!(outputs["start"], json!({"seed": 7}));
        assert_eq!(outputs["end"]["price"]["price"], json!(100.0));
    }

    #[tokio::test]
    async fn test_profit_aggregation() {
        let mut builder = WorkflowBuilder::new("wf", "Three trades")
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (0.0, 0.0))
            .add_node("end", ComponentType::End, (0.0, 0.0))
            .connect("start", "price");
        for i in 0..3 {
            let exec = format!("exec{}", i);
            let collect = format!("collect{}", i);
            builder = builder
                .add_node(exec.clone(), ComponentType::TradeExecutor, (0.0, 0.0))
                .add_node(collect.clone(), ComponentType::ResultCollector, (0.0, 0.0))
                .connect("price", exec.clone())
                .connect(exec, collect.clone())
                .connect(collect, "end");
        }
        let wf = builder.build();

        let engine = ExecutionEngine::new(services(false, vec![10.0, -3.0, 7.0]));
        let run = engine.execute(&wf, new_run(Value::Null)).await;

        assert_eq!(run.state, RunState::Success);
        assert!((run.profit.amount - 14.0).abs() < 1e-9);
        // three executors at the default notional of 100
        assert!((run.profit.percentage - 14.0 / 300.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_cycle_fails_before_any_node_runs() {
        let mut wf = WorkflowBuilder::new("wf", "Cycle")
            .add_node("eval", ComponentType::AiEvaluator, (0.0, 0.0))
            .add_node("exec", ComponentType::TradeExecutor, (0.0, 0.0))
            .connect("eval", "exec")
            .build();
        wf.connections.push(Connection::new("back", "exec", "eval"));

        let engine = ExecutionEngine::new(services(false, vec![]));
        let run = engine.execute(&wf, new_run(Value::Null)).await;

        assert_eq!(run.state, RunState::Failed);
        assert!(run
            .node_states
            .values()
            .all(|s| s.status == NodeRunStatus::Skipped));
        assert!(run.error.as_deref().unwrap().contains("Cycle"));
    }
}
