//! Workflow and run storage
//!
//! `WorkflowStore` is the persistence seam of the engine. `JsonStore` keeps
//! everything in memory for fast access, with optional JSON file
//! persistence (`workflows/<id>.json`, `runs/<id>.json`) for durability
//! across restarts.
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::JsonStore;
//!
//! let store = JsonStore::with_persistence(".flows");
//! let count = store.load_from_disk().await?;
//! println!("Loaded {} documents", count);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::sync::RwLock;

use crate::config::StoreConfig;
use crate::error::{FlowEngineError, Result};
use crate::execution::{RunStateUpdate, WorkflowRun};
use crate::graph::Workflow;
use crate::types::RunType;

const WORKFLOWS_DIR: &str = "workflows";
const RUNS_DIR: &str = "runs";

/// Persistence for workflows and their runs
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// All workflows, most recently updated first
    async fn list_workflows(&self) -> Result<Vec<Workflow>>;

    async fn get_workflow(&self, id: &str) -> Result<Workflow>;

    /// Insert or replace a workflow.
    ///
    /// Assigns an id when the workflow has none and bumps `updated_at`.
    async fn save_workflow(&self, workflow: Workflow) -> Result<Workflow>;

    /// Delete a workflow together with its runs
    async fn delete_workflow(&self, id: &str) -> Result<()>;

    /// Runs, oldest first, optionally restricted to one workflow
    async fn list_runs(&self, workflow_id: Option<&str>) -> Result<Vec<WorkflowRun>>;

    async fn get_run(&self, id: &str) -> Result<WorkflowRun>;

    /// Create a queued run for an existing workflow
    async fn create_run(
        &self,
        workflow_id: &str,
        params: serde_json::Value,
        run_type: RunType,
    ) -> Result<WorkflowRun>;

    /// Update a non-terminal run
    async fn update_run_state(&self, id: &str, update: RunStateUpdate) -> Result<WorkflowRun>;
}

/// In-memory store with optional JSON file persistence
#[derive(Debug, Default)]
pub struct JsonStore {
    workflows: RwLock<HashMap<String, Workflow>>,
    runs: RwLock<HashMap<String, WorkflowRun>>,
    persist_path: Option<PathBuf>,
}

impl JsonStore {
    /// Create a new in-memory store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that persists under the given directory.
    ///
    /// Directories are created on first write.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            persist_path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        match &config.data_dir {
            Some(dir) => Self::with_persistence(dir),
            None => Self::new(),
        }
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    /// Load all workflows and runs from the persistence directory.
    ///
    /// Returns the number of documents loaded. Unparseable files are
    /// skipped with a warning.
    pub async fn load_from_disk(&self) -> Result<usize> {
        let Some(ref path) = self.persist_path else {
            return Ok(0);
        };

        let workflows: Vec<Workflow> = read_documents(&path.join(WORKFLOWS_DIR), |content| {
            Workflow::from_document(content)
        })
        .await?;
        let runs: Vec<WorkflowRun> =
            read_documents(&path.join(RUNS_DIR), parse_json::<WorkflowRun>).await?;
        let count = workflows.len() + runs.len();

        let mut workflow_map = self.workflows.write().await;
        for workflow in workflows {
            log::info!("Loaded workflow '{}' ({})", workflow.id, workflow.name);
            workflow_map.insert(workflow.id.clone(), workflow);
        }
        drop(workflow_map);

        let mut run_map = self.runs.write().await;
        for run in runs {
            run_map.insert(run.id.clone(), run);
        }
        Ok(count)
    }

    async fn write_document(&self, dir: &str, id: &str, content: String) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        let dir_path = path.join(dir);
        fs::create_dir_all(&dir_path).await?;
        let file_path = dir_path.join(format!("{}.json", id));
        fs::write(&file_path, content).await?;
        log::debug!("Saved '{}' to {:?}", id, file_path);
        Ok(())
    }

    async fn delete_document(&self, dir: &str, id: &str) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        let file_path = path.join(dir).join(format!("{}.json", id));
        if fs::try_exists(&file_path).await? {
            fs::remove_file(&file_path).await?;
            log::debug!("Deleted '{}' from {:?}", id, file_path);
        }
        Ok(())
    }

    async fn persist_run(&self, run: &WorkflowRun) -> Result<()> {
        let content = serde_json::to_string_pretty(run)?;
        self.write_document(RUNS_DIR, &run.id, content).await
    }
}

fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(serde_json::from_str(content)?)
}

async fn read_documents<T>(dir: &Path, parse: impl Fn(&str) -> Result<T>) -> Result<Vec<T>> {
    let mut documents = Vec::new();
    if !fs::try_exists(dir).await? {
        return Ok(documents);
    }

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_path = entry.path();
        if file_path.extension().map_or(false, |e| e == "json") {
            let content = fs::read_to_string(&file_path).await?;
            match parse(&content) {
                Ok(document) => documents.push(document),
                Err(e) => log::warn!("Failed to parse {:?}: {}", file_path, e),
            }
        }
    }
    Ok(documents)
}

#[async_trait]
impl WorkflowStore for JsonStore {
    async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let mut workflows: Vec<Workflow> = self.workflows.read().await.values().cloned().collect();
        workflows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(workflows)
    }

    async fn get_workflow(&self, id: &str) -> Result<Workflow> {
        self.workflows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FlowEngineError::not_found(format!("workflow '{}'", id)))
    }

    async fn save_workflow(&self, mut workflow: Workflow) -> Result<Workflow> {
        if workflow.id.is_empty() {
            workflow.id = format!("wf-{}", uuid::Uuid::new_v4());
        }
        workflow.updated_at = Utc::now();

        self.write_document(WORKFLOWS_DIR, &workflow.id, workflow.to_document()?)
            .await?;
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow.clone());
        log::info!("Saved workflow '{}' ({} nodes)", workflow.id, workflow.nodes.len());
        Ok(workflow)
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        if self.workflows.write().await.remove(id).is_none() {
            return Err(FlowEngineError::not_found(format!("workflow '{}'", id)));
        }
        self.delete_document(WORKFLOWS_DIR, id).await?;

        let run_ids: Vec<String> = {
            let mut runs = self.runs.write().await;
            let ids: Vec<String> = runs
                .values()
                .filter(|r| r.workflow_id == id)
                .map(|r| r.id.clone())
                .collect();
            for run_id in &ids {
                runs.remove(run_id);
            }
            ids
        };
        for run_id in &run_ids {
            self.delete_document(RUNS_DIR, run_id).await?;
        }
        log::info!("Deleted workflow '{}' and {} run(s)", id, run_ids.len());
        Ok(())
    }

    async fn list_runs(&self, workflow_id: Option<&str>) -> Result<Vec<WorkflowRun>> {
        let mut runs: Vec<WorkflowRun> = self
            .runs
            .read()
            .await
            .values()
            .filter(|r| workflow_id.map_or(true, |id| r.workflow_id == id))
            .cloned()
            .collect();
        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(runs)
    }

    async fn get_run(&self, id: &str) -> Result<WorkflowRun> {
        self.runs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FlowEngineError::not_found(format!("run '{}'", id)))
    }

    async fn create_run(
        &self,
        workflow_id: &str,
        params: serde_json::Value,
        run_type: RunType,
    ) -> Result<WorkflowRun> {
        if !self.workflows.read().await.contains_key(workflow_id) {
            return Err(FlowEngineError::not_found(format!("workflow '{}'", workflow_id)));
        }

        let run = WorkflowRun::new(workflow_id, params, run_type);
        self.persist_run(&run).await?;
        self.runs.write().await.insert(run.id.clone(), run.clone());
        log::debug!("Created run '{}' for workflow '{}'", run.id, workflow_id);
        Ok(run)
    }

    async fn update_run_state(&self, id: &str, update: RunStateUpdate) -> Result<WorkflowRun> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get(id)
            .ok_or_else(|| FlowEngineError::not_found(format!("run '{}'", id)))?;

        let mut updated = stored.clone();
        updated.apply(update)?;
        self.persist_run(&updated).await?;
        runs.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::execution::RunState;
    use crate::types::ComponentType;
    use tempfile::TempDir;

    fn sample(id: &str) -> Workflow {
        WorkflowBuilder::new(id, "Sample")
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (250.0, 0.0))
            .connect("start", "price")
            .build()
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_bumps_updated_at() {
        let store = JsonStore::new();
        let wf = sample("");
        let before = wf.updated_at;

        let saved = store.save_workflow(wf).await.unwrap();
        assert!(saved.id.starts_with("wf-"));
        assert!(saved.updated_at >= before);
        assert_eq!(store.get_workflow(&saved.id).await.unwrap().nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_documents_are_not_found() {
        let store = JsonStore::new();
        assert!(matches!(store.get_workflow("nope").await, Err(FlowEngineError::NotFound(_))));
        assert!(matches!(store.get_run("nope").await, Err(FlowEngineError::NotFound(_))));
        assert!(matches!(
            store.create_run("nope", serde_json::Value::Null, RunType::Manual).await,
            Err(FlowEngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_terminal_run_rejects_updates() {
        let store = JsonStore::new();
        store.save_workflow(sample("wf-1")).await.unwrap();
        let run = store
            .create_run("wf-1", serde_json::Value::Null, RunType::Manual)
            .await
            .unwrap();
        assert_eq!(run.state, RunState::Queued);

        store
            .update_run_state(&run.id, RunStateUpdate::state(RunState::Running))
            .await
            .unwrap();
        let done = store
            .update_run_state(&run.id, RunStateUpdate::state(RunState::Success))
            .await
            .unwrap();
        assert!(done.start_time.is_some());

        let err = store
            .update_run_state(&run.id, RunStateUpdate::failed("late"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowEngineError::Persistence(_)));
        assert_eq!(store.get_run(&run.id).await.unwrap().state, RunState::Success);
    }

    #[tokio::test]
    async fn test_delete_workflow_deletes_runs() {
        let store = JsonStore::new();
        store.save_workflow(sample("a")).await.unwrap();
        store.save_workflow(sample("b")).await.unwrap();
        store.create_run("a", serde_json::Value::Null, RunType::Manual).await.unwrap();
        store.create_run("a", serde_json::Value::Null, RunType::Scheduled).await.unwrap();
        store.create_run("b", serde_json::Value::Null, RunType::Manual).await.unwrap();

        assert_eq!(store.list_runs(Some("a")).await.unwrap().len(), 2);
        store.delete_workflow("a").await.unwrap();

        assert_eq!(store.list_workflows().await.unwrap().len(), 1);
        let remaining = store.list_runs(None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].workflow_id, "b");
    }

    #[tokio::test]
    async fn test_persistent_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flows");

        let run_id = {
            let store = JsonStore::with_persistence(&path);
            store.save_workflow(sample("persist-test")).await.unwrap();
            let run = store
                .create_run("persist-test", serde_json::json!({"k": 1}), RunType::Manual)
                .await
                .unwrap();
            run.id
        };
        assert!(path.join("workflows").join("persist-test.json").exists());
        assert!(path.join("runs").join(format!("{}.json", run_id)).exists());

        let store = JsonStore::with_persistence(&path);
        let count = store.load_from_disk().await.unwrap();
        assert_eq!(count, 2);

        let wf = store.get_workflow("persist-test").await.unwrap();
        let expected = sample("persist-test");
        assert_eq!(wf.nodes, expected.nodes);
        assert_eq!(wf.connections, expected.connections);
        assert_eq!(store.get_run(&run_id).await.unwrap().params, serde_json::json!({"k": 1}));
    }
}
