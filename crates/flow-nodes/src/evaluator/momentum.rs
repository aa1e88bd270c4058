//! Momentum Evaluator
//!
//! Rule-based stand-in for the AI evaluator. Confidence grows linearly with
//! the size of the last price move and saturates at `full_confidence_move`.
//! The strategy is actionable only when the confidence reaches the node's
//! configured threshold.

use async_trait::async_trait;
use flow_engine::components::AiEvaluatorConfig;
use flow_engine::{EvaluatorService, NodeInputs, ServiceResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PaperError, Result};

/// Trade direction decided by an evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Price observation pulled out of upstream listener output
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PriceInput {
    pub symbol: String,
    pub price: f64,
    pub momentum: f64,
}

/// First price listener result among the inputs, in source-id order
pub(crate) fn find_price(inputs: &NodeInputs) -> Option<PriceInput> {
    inputs.values().find_map(|value| {
        if value.get("kind").and_then(Value::as_str) != Some("price") {
            return None;
        }
        Some(PriceInput {
            symbol: value.get("symbol")?.as_str()?.to_string(),
            price: value.get("price")?.as_f64()?,
            momentum: value.get("momentum").and_then(Value::as_f64).unwrap_or(0.0),
        })
    })
}

#[derive(Debug, Clone)]
pub struct MomentumEvaluator {
    /// Relative move that yields full confidence (0.02 = 2%)
    full_confidence_move: f64,
}

impl Default for MomentumEvaluator {
    fn default() -> Self {
        Self {
            full_confidence_move: 0.02,
        }
    }
}

impl MomentumEvaluator {
    pub fn new(full_confidence_move: f64) -> Self {
        if !(full_confidence_move > 0.0) {
            log::warn!(
                "Invalid full confidence move {}, using default",
                full_confidence_move
            );
            return Self::default();
        }
        Self {
            full_confidence_move,
        }
    }

    pub fn confidence(&self, momentum: f64) -> f64 {
        (momentum.abs() / self.full_confidence_move).min(1.0)
    }

    fn evaluate(&self, inputs: &NodeInputs, config: &AiEvaluatorConfig) -> Result<Value> {
        let price = find_price(inputs).ok_or(PaperError::MissingPrice)?;
        let confidence = self.confidence(price.momentum);

        let action = if price.momentum == 0.0 || confidence < config.confidence_threshold {
            TradeAction::Hold
        } else if price.momentum > 0.0 {
            TradeAction::Buy
        } else {
            TradeAction::Sell
        };

        log::debug!(
            "MomentumEvaluator: {} momentum {:.4} confidence {:.2} -> {:?}",
            price.symbol,
            price.momentum,
            confidence,
            action
        );

        Ok(json!({
            "action": action,
            "symbol": price.symbol,
            "price": price.price,
            "momentum": price.momentum,
            "confidence": confidence,
            "threshold": config.confidence_threshold,
            "model": config.model,
        }))
    }
}

#[async_trait]
impl EvaluatorService for MomentumEvaluator {
    async fn infer(&self, inputs: &NodeInputs, config: &AiEvaluatorConfig) -> ServiceResult {
        match self.evaluate(inputs, config) {
            Ok(strategy) => ServiceResult::success(strategy),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_input(momentum: f64) -> NodeInputs {
        NodeInputs::from([(
            "price".to_string(),
            json!({"kind": "price", "symbol": "SOL/USDC", "price": 101.0, "momentum": momentum}),
        )])
    }

    #[tokio::test]
    async fn test_strong_upward_move_buys() {
        let evaluator = MomentumEvaluator::default();
        let strategy = evaluator
            .infer(&price_input(0.03), &AiEvaluatorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(strategy["action"], "buy");
        assert_eq!(strategy["confidence"], 1.0);
    }

    #[tokio::test]
    async fn test_strong_downward_move_sells() {
        let evaluator = MomentumEvaluator::default();
        let strategy = evaluator
            .infer(&price_input(-0.015), &AiEvaluatorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(strategy["action"], "sell");
    }

    #[tokio::test]
    async fn test_weak_move_holds() {
        let evaluator = MomentumEvaluator::default();
        // 0.5% move is 0.25 confidence, below the 0.7 default threshold
        let strategy = evaluator
            .infer(&price_input(0.005), &AiEvaluatorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(strategy["action"], "hold");
        assert!((strategy["confidence"].as_f64().unwrap() - 0.25).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_price_is_an_error() {
        let evaluator = MomentumEvaluator::default();
        let inputs = NodeInputs::from([(
            "wallet".to_string(),
            json!({"kind": "wallet", "balances": {}}),
        )]);
        let result = evaluator.infer(&inputs, &AiEvaluatorConfig::default()).await;
        assert_eq!(result, ServiceResult::error("no price data among inputs"));
    }

    #[test]
    fn test_invalid_scale_falls_back() {
        let evaluator = MomentumEvaluator::new(0.0);
        assert_eq!(evaluator.confidence(0.01), 0.5);
    }
}
