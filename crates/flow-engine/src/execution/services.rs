//! External node services
//!
//! The engine never talks to an exchange, a chain or a model directly. Each
//! component category is backed by one of these traits, and a host wires in
//! implementations through `NodeServices`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::{
    AiEvaluatorConfig, PriceListenerConfig, ResultCollectorConfig, TradeExecutorConfig,
    WalletListenerConfig,
};
use crate::types::NodeId;

/// Upstream results keyed by source node id
pub type NodeInputs = BTreeMap<NodeId, Value>;

/// Uniform reply of every node service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceResult {
    Success { data: Value },
    Error { error: String },
}

impl ServiceResult {
    pub fn success(data: Value) -> Self {
        ServiceResult::Success { data }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ServiceResult::Error {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ServiceResult::Success { .. })
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self {
            ServiceResult::Success { data } => Ok(data),
            ServiceResult::Error { error } => Err(error),
        }
    }
}

/// Which feed a listener node reads
#[derive(Debug, Clone, Copy)]
pub enum ListenerSource<'a> {
    Price(&'a PriceListenerConfig),
    Wallet(&'a WalletListenerConfig),
}

/// Market and wallet data feeds
#[async_trait]
pub trait ListenerService: Send + Sync {
    async fn fetch_or_stream(&self, source: ListenerSource<'_>) -> ServiceResult;
}

/// Strategy evaluation over listener data
#[async_trait]
pub trait EvaluatorService: Send + Sync {
    async fn infer(&self, inputs: &NodeInputs, config: &AiEvaluatorConfig) -> ServiceResult;
}

/// Trade submission
///
/// A successful result should carry the traded notional as `amount` and may
/// carry an immediate `profit`.
#[async_trait]
pub trait ExecutorService: Send + Sync {
    async fn submit(&self, strategy: &NodeInputs, config: &TradeExecutorConfig) -> ServiceResult;
}

/// Position monitoring; a successful result should carry the realized `profit`
#[async_trait]
pub trait CollectorService: Send + Sync {
    async fn monitor(
        &self,
        tx_result: &NodeInputs,
        config: &ResultCollectorConfig,
    ) -> ServiceResult;
}

/// The service implementations a run dispatches to
#[derive(Clone)]
pub struct NodeServices {
    pub listener: Arc<dyn ListenerService>,
    pub evaluator: Arc<dyn EvaluatorService>,
    pub executor: Arc<dyn ExecutorService>,
    pub collector: Arc<dyn CollectorService>,
}

impl NodeServices {
    pub fn new(
        listener: Arc<dyn ListenerService>,
        evaluator: Arc<dyn EvaluatorService>,
        executor: Arc<dyn ExecutorService>,
        collector: Arc<dyn CollectorService>,
    ) -> Self {
        Self {
            listener,
            evaluator,
            executor,
            collector,
        }
    }
}

impl std::fmt::Debug for NodeServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeServices").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_result_wire_shape() {
        let ok = serde_json::to_value(ServiceResult::success(json!({"price": 1.5}))).unwrap();
        assert_eq!(ok, json!({"status": "success", "data": {"price": 1.5}}));

        let err: ServiceResult =
            serde_json::from_value(json!({"status": "error", "error": "rate limited"})).unwrap();
        assert!(!err.is_success());
        assert_eq!(err.into_result(), Err("rate limited".to_string()));
    }
}
