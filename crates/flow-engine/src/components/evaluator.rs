//! AI evaluator component

use serde::{Deserialize, Serialize};

use crate::registry::{ComponentSchema, SchemaFn};
use crate::types::{ComponentType, PortMode};

/// Configuration for the AI evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AiEvaluatorConfig {
    /// Model identifier passed to the evaluator service
    pub model: String,
    /// Instruction prompt for the strategy decision
    pub prompt: String,
    /// Minimum confidence for a strategy to be actionable (0..=1)
    pub confidence_threshold: f64,
}

impl Default for AiEvaluatorConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            prompt: "Decide whether to buy, sell or hold based on the inputs.".to_string(),
            confidence_threshold: 0.7,
        }
    }
}

impl AiEvaluatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "confidenceThreshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        Ok(())
    }
}

pub fn ai_evaluator_schema() -> ComponentSchema {
    ComponentSchema::new(
        ComponentType::AiEvaluator,
        "AI Evaluator",
        "Turns listener data into a trading strategy",
    )
    .inputs(
        PortMode::Multi,
        &[ComponentType::PriceListener, ComponentType::WalletListener],
    )
    .outputs(
        PortMode::Multi,
        &[ComponentType::TradeExecutor, ComponentType::End],
    )
    .with_default_config(serde_json::to_value(AiEvaluatorConfig::default()).unwrap_or_default())
}

inventory::submit!(SchemaFn(ai_evaluator_schema));
