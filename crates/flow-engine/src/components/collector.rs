//! Result collector component

use serde::{Deserialize, Serialize};

use crate::registry::{ComponentSchema, SchemaFn};
use crate::types::{ComponentType, PortMode};

/// Configuration for the result collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ResultCollectorConfig {
    /// Close the position once it gains this percentage
    pub take_profit_pct: f64,
    /// Close the position once it loses this percentage
    pub stop_loss_pct: f64,
    /// How long the collector monitors a position
    pub monitor_secs: u64,
}

impl Default for ResultCollectorConfig {
    fn default() -> Self {
        Self {
            take_profit_pct: 5.0,
            stop_loss_pct: 2.0,
            monitor_secs: 3600,
        }
    }
}

impl ResultCollectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.take_profit_pct > 0.0) || !(self.stop_loss_pct > 0.0) {
            return Err("takeProfitPct and stopLossPct must be positive".to_string());
        }
        Ok(())
    }
}

pub fn result_collector_schema() -> ComponentSchema {
    ComponentSchema::new(
        ComponentType::ResultCollector,
        "Result Collector",
        "Monitors executed trades and reports realized profit",
    )
    .inputs(PortMode::Multi, &[ComponentType::TradeExecutor])
    .outputs(PortMode::Single, &[ComponentType::End])
    .with_default_config(serde_json::to_value(ResultCollectorConfig::default()).unwrap_or_default())
}

inventory::submit!(SchemaFn(result_collector_schema));
