//! Start and End components

use serde::{Deserialize, Serialize};

use crate::registry::{ComponentSchema, SchemaFn};
use crate::types::{ComponentType, PortMode, RunType};

/// Configuration for the Start node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct StartConfig {
    /// How runs of this flow are triggered
    pub trigger: RunType,
    /// Interval for scheduled triggers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            trigger: RunType::Manual,
            interval_secs: None,
        }
    }
}

impl StartConfig {
    pub fn validate(&self) -> Result<(), String> {
        match (self.trigger, self.interval_secs) {
            (RunType::Scheduled, None) => {
                Err("scheduled trigger requires intervalSecs".to_string())
            }
            (RunType::Scheduled, Some(0)) => Err("intervalSecs must be positive".to_string()),
            _ => Ok(()),
        }
    }
}

/// Configuration for the End node (no settings)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndConfig {}

pub fn start_schema() -> ComponentSchema {
    ComponentSchema::new(ComponentType::Start, "Start", "Entry point of the flow")
        .inputs(PortMode::Single, &[])
        .outputs(
            PortMode::Multi,
            &[ComponentType::PriceListener, ComponentType::WalletListener],
        )
        .with_default_config(serde_json::to_value(StartConfig::default()).unwrap_or_default())
}

pub fn end_schema() -> ComponentSchema {
    ComponentSchema::new(ComponentType::End, "End", "Exit point collecting the flow's results")
        .inputs(
            PortMode::Multi,
            &[
                ComponentType::PriceListener,
                ComponentType::WalletListener,
                ComponentType::AiEvaluator,
                ComponentType::TradeExecutor,
                ComponentType::ResultCollector,
            ],
        )
        .outputs(PortMode::Single, &[])
        .with_default_config(serde_json::json!({}))
}

inventory::submit!(SchemaFn(start_schema));
inventory::submit!(SchemaFn(end_schema));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_start_requires_interval() {
        let config = StartConfig {
            trigger: RunType::Scheduled,
            interval_secs: None,
        };
        assert!(config.validate().is_err());

        let config = StartConfig {
            trigger: RunType::Scheduled,
            interval_secs: Some(300),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_start_has_no_inputs() {
        assert!(start_schema().input_connectables.is_empty());
        assert!(end_schema().output_connectables.is_empty());
    }
}
