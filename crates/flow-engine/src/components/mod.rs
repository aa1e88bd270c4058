//! Built-in trading components
//!
//! Each submodule defines the typed configuration for its component types
//! and registers their schemas at link time. `NodeConfig` is the sum type a
//! node carries; its variant always matches the node's component type.
//!
//! # Registration
//!
//! ```ignore
//! inventory::submit!(flow_engine::SchemaFn(price_listener_schema));
//! ```

pub mod collector;
pub mod evaluator;
pub mod executor;
pub mod flow;
pub mod listener;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FlowEngineError, Result};
use crate::types::ComponentType;

pub use collector::ResultCollectorConfig;
pub use evaluator::AiEvaluatorConfig;
pub use executor::TradeExecutorConfig;
pub use flow::{EndConfig, StartConfig};
pub use listener::{PriceListenerConfig, WalletListenerConfig};

/// Typed configuration of a node, one variant per component type
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Start(StartConfig),
    PriceListener(PriceListenerConfig),
    WalletListener(WalletListenerConfig),
    AiEvaluator(AiEvaluatorConfig),
    TradeExecutor(TradeExecutorConfig),
    ResultCollector(ResultCollectorConfig),
    End(EndConfig),
}

impl NodeConfig {
    /// The component type this configuration belongs to
    pub fn component_type(&self) -> ComponentType {
        match self {
            NodeConfig::Start(_) => ComponentType::Start,
            NodeConfig::PriceListener(_) => ComponentType::PriceListener,
            NodeConfig::WalletListener(_) => ComponentType::WalletListener,
            NodeConfig::AiEvaluator(_) => ComponentType::AiEvaluator,
            NodeConfig::TradeExecutor(_) => ComponentType::TradeExecutor,
            NodeConfig::ResultCollector(_) => ComponentType::ResultCollector,
            NodeConfig::End(_) => ComponentType::End,
        }
    }

    /// Default configuration for a component type
    pub fn default_for(component_type: ComponentType) -> Self {
        match component_type {
            ComponentType::Start => NodeConfig::Start(StartConfig::default()),
            ComponentType::PriceListener => {
                NodeConfig::PriceListener(PriceListenerConfig::default())
            }
            ComponentType::WalletListener => {
                NodeConfig::WalletListener(WalletListenerConfig::default())
            }
            ComponentType::AiEvaluator => NodeConfig::AiEvaluator(AiEvaluatorConfig::default()),
            ComponentType::TradeExecutor => {
                NodeConfig::TradeExecutor(TradeExecutorConfig::default())
            }
            ComponentType::ResultCollector => {
                NodeConfig::ResultCollector(ResultCollectorConfig::default())
            }
            ComponentType::End => NodeConfig::End(EndConfig::default()),
        }
    }

    /// Parse and validate a configuration map for the given component type.
    ///
    /// Missing keys take their defaults; unknown keys and out-of-range values
    /// are rejected. `null` is treated as an empty map.
    pub fn from_value(component_type: ComponentType, value: serde_json::Value) -> Result<Self> {
        let value = match value {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };

        let config = match component_type {
            ComponentType::Start => NodeConfig::Start(parse(component_type, value)?),
            ComponentType::PriceListener => {
                NodeConfig::PriceListener(parse(component_type, value)?)
            }
            ComponentType::WalletListener => {
                NodeConfig::WalletListener(parse(component_type, value)?)
            }
            ComponentType::AiEvaluator => NodeConfig::AiEvaluator(parse(component_type, value)?),
            ComponentType::TradeExecutor => {
                NodeConfig::TradeExecutor(parse(component_type, value)?)
            }
            ComponentType::ResultCollector => {
                NodeConfig::ResultCollector(parse(component_type, value)?)
            }
            ComponentType::End => NodeConfig::End(parse(component_type, value)?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration back to a key/value map
    pub fn to_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            NodeConfig::Start(c) => to_json(c)?,
            NodeConfig::PriceListener(c) => to_json(c)?,
            NodeConfig::WalletListener(c) => to_json(c)?,
            NodeConfig::AiEvaluator(c) => to_json(c)?,
            NodeConfig::TradeExecutor(c) => to_json(c)?,
            NodeConfig::ResultCollector(c) => to_json(c)?,
            NodeConfig::End(c) => to_json(c)?,
        };
        Ok(value)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let component = self.component_type();
        let outcome = match self {
            NodeConfig::Start(c) => c.validate(),
            NodeConfig::PriceListener(c) => c.validate(),
            NodeConfig::WalletListener(c) => c.validate(),
            NodeConfig::AiEvaluator(c) => c.validate(),
            NodeConfig::TradeExecutor(c) => c.validate(),
            NodeConfig::ResultCollector(c) => c.validate(),
            NodeConfig::End(_) => Ok(()),
        };
        outcome.map_err(|reason| FlowEngineError::invalid_config(component.as_str(), reason))
    }
}

fn parse<T: DeserializeOwned>(
    component_type: ComponentType,
    value: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| FlowEngineError::invalid_config(component_type.as_str(), e.to_string()))
}

fn to_json<T: Serialize>(config: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(config)?)
}
