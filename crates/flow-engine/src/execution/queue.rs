//! Single-worker run queue
//!
//! Runs are executed strictly one at a time in submission order. The queue
//! is an unbounded channel drained by one worker task; the worker owns every
//! run-state mutation after the run has been created.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{FlowEngineError, Result};
use crate::events::RunEvent;
use crate::execution::engine::ExecutionEngine;
use crate::execution::run::{RunState, RunStateUpdate, WorkflowRun};
use crate::store::WorkflowStore;
use crate::types::{RunId, RunType};

struct RunRequest {
    run: WorkflowRun,
    reply: oneshot::Sender<WorkflowRun>,
}

/// Handle to a queued run
#[derive(Debug)]
pub struct RunTicket {
    pub run_id: RunId,
    receiver: oneshot::Receiver<WorkflowRun>,
}

impl RunTicket {
    /// Wait for the run to reach a terminal state
    pub async fn wait(self) -> Result<WorkflowRun> {
        self.receiver.await.map_err(|_| FlowEngineError::QueueClosed)
    }
}

/// FIFO queue feeding a single execution worker
pub struct RunQueue {
    sender: mpsc::UnboundedSender<RunRequest>,
    store: Arc<dyn WorkflowStore>,
    engine: ExecutionEngine,
    worker: JoinHandle<()>,
}

impl RunQueue {
    /// Spawn the worker on the current tokio runtime
    pub fn start(engine: ExecutionEngine, store: Arc<dyn WorkflowStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(receiver, engine.clone(), Arc::clone(&store)));
        Self {
            sender,
            store,
            engine,
            worker,
        }
    }

    /// Create a queued run in the store and hand it to the worker
    pub async fn enqueue(
        &self,
        workflow_id: &str,
        params: serde_json::Value,
        run_type: RunType,
    ) -> Result<RunTicket> {
        let run = self.store.create_run(workflow_id, params, run_type).await?;
        let run_id = run.id.clone();

        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(RunRequest { run, reply })
            .map_err(|_| FlowEngineError::QueueClosed)?;

        if let Err(e) = self.engine.event_sink().send(RunEvent::RunQueued {
            run_id: run_id.clone(),
            workflow_id: workflow_id.to_string(),
        }) {
            log::debug!("Dropped run event: {}", e);
        }
        log::debug!("Queued run '{}' for workflow '{}'", run_id, workflow_id);
        Ok(RunTicket { run_id, receiver })
    }

    /// Stop accepting runs and wait for the worker to drain the queue
    pub async fn shutdown(self) -> Result<()> {
        drop(self.sender);
        self.worker
            .await
            .map_err(|e| FlowEngineError::persistence(format!("run worker panicked: {}", e)))
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<RunRequest>,
    engine: ExecutionEngine,
    store: Arc<dyn WorkflowStore>,
) {
    while let Some(RunRequest { run, reply }) = receiver.recv().await {
        let finished = process(&engine, store.as_ref(), run).await;
        // The submitter may have dropped its ticket
        let _ = reply.send(finished);
    }
    log::debug!("Run queue worker stopped");
}

async fn process(
    engine: &ExecutionEngine,
    store: &dyn WorkflowStore,
    run: WorkflowRun,
) -> WorkflowRun {
    let workflow = match store.get_workflow(&run.workflow_id).await {
        Ok(workflow) => workflow,
        Err(e) => {
            log::error!("Run '{}' cannot load its workflow: {}", run.id, e);
            let mut failed = run;
            let update = RunStateUpdate::failed(e.to_string());
            return match store.update_run_state(&failed.id, update.clone()).await {
                Ok(stored) => stored,
                Err(_) => {
                    // Best effort when the store itself is failing
                    let _ = failed.apply(update);
                    failed
                }
            };
        }
    };

    let run = match store
        .update_run_state(&run.id, RunStateUpdate::state(RunState::Running))
        .await
    {
        Ok(running) => running,
        Err(e) => {
            log::warn!("Could not mark run '{}' running: {}", run.id, e);
            run
        }
    };

    let finished = engine.execute(&workflow, run).await;
    match store
        .update_run_state(&finished.id, RunStateUpdate::terminal(&finished))
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            log::error!("Failed to persist run '{}': {}", finished.id, e);
            finished
        }
    }
}
