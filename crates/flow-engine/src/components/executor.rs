//! Trade executor component

use serde::{Deserialize, Serialize};

use crate::registry::{ComponentSchema, SchemaFn};
use crate::types::{ComponentType, PortMode};

/// Configuration for the trade executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TradeExecutorConfig {
    /// Trading pair to submit orders for
    pub pair: String,
    /// Notional amount per trade (quote currency)
    pub amount: f64,
    /// Maximum accepted slippage in basis points
    pub slippage_bps: u32,
    /// Maximum total position size
    pub max_position: f64,
}

impl Default for TradeExecutorConfig {
    fn default() -> Self {
        Self {
            pair: "SOL/USDC".to_string(),
            amount: 100.0,
            slippage_bps: 50,
            max_position: 1000.0,
        }
    }
}

impl TradeExecutorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.amount > 0.0) {
            return Err(format!("amount must be positive, got {}", self.amount));
        }
        if self.max_position < self.amount {
            return Err(format!(
                "maxPosition ({}) must be at least amount ({})",
                self.max_position, self.amount
            ));
        }
        if self.slippage_bps > 10_000 {
            return Err("slippageBps must not exceed 10000".to_string());
        }
        Ok(())
    }
}

pub fn trade_executor_schema() -> ComponentSchema {
    ComponentSchema::new(
        ComponentType::TradeExecutor,
        "Trade Executor",
        "Submits trades for an evaluated strategy",
    )
    .inputs(
        PortMode::Multi,
        &[ComponentType::AiEvaluator, ComponentType::PriceListener],
    )
    .outputs(
        PortMode::Multi,
        &[ComponentType::ResultCollector, ComponentType::End],
    )
    .with_default_config(serde_json::to_value(TradeExecutorConfig::default()).unwrap_or_default())
}

inventory::submit!(SchemaFn(trade_executor_schema));
