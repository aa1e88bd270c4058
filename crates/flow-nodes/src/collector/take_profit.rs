//! Take-Profit / Stop-Loss Collector
//!
//! Watches an open paper position on the shared price feed, one tick per
//! `tick_secs` of the configured monitoring window. The position closes at
//! the first tick that crosses either bound, or at the last observed price
//! when the window (or the price script) runs out.

use std::sync::Arc;

use async_trait::async_trait;
use flow_engine::components::ResultCollectorConfig;
use flow_engine::{CollectorService, NodeInputs, ServiceResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::book::{PaperBook, Position};
use crate::error::{PaperError, Result};
use crate::evaluator::TradeAction;
use crate::listener::ScriptedPriceFeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Timeout,
}

/// Percentage gain of a position at `price`
pub fn change_pct(position: &Position, price: f64) -> f64 {
    match position.action {
        TradeAction::Buy => (price - position.fill_price) / position.fill_price * 100.0,
        TradeAction::Sell => (position.fill_price - price) / position.fill_price * 100.0,
        TradeAction::Hold => 0.0,
    }
}

#[derive(Debug, Clone)]
pub struct TakeProfitCollector {
    prices: Arc<ScriptedPriceFeed>,
    book: Arc<PaperBook>,
    tick_secs: u64,
}

impl TakeProfitCollector {
    pub fn new(prices: Arc<ScriptedPriceFeed>, book: Arc<PaperBook>) -> Self {
        Self {
            prices,
            book,
            tick_secs: 60,
        }
    }

    pub fn with_tick_secs(mut self, tick_secs: u64) -> Self {
        self.tick_secs = tick_secs.max(1);
        self
    }

    fn max_ticks(&self, config: &ResultCollectorConfig) -> u64 {
        (config.monitor_secs / self.tick_secs).max(1)
    }

    fn collect(&self, inputs: &NodeInputs, config: &ResultCollectorConfig) -> Result<Value> {
        let trade = inputs
            .values()
            .find(|value| value.get("filled").and_then(Value::as_bool).is_some())
            .ok_or(PaperError::MissingTrade)?;

        let order_id = match trade.get("orderId").and_then(Value::as_str) {
            Some(id) if trade["filled"] == true => id,
            _ => {
                log::debug!("TakeProfitCollector: nothing filled, nothing to monitor");
                return Ok(json!({"closed": false, "profit": 0.0}));
            }
        };
        let position = self.book.close(order_id).ok_or(PaperError::MissingTrade)?;

        let mut exit_price = position.fill_price;
        let mut reason = ExitReason::Timeout;
        let mut last_index = None;
        for _ in 0..self.max_ticks(config) {
            let tick = match self.prices.tick(&position.pair) {
                Ok(tick) => tick,
                Err(e) => {
                    // Keep the book consistent when monitoring cannot start
                    self.book.open(position);
                    return Err(e);
                }
            };
            if last_index == Some(tick.index) {
                break;
            }
            last_index = Some(tick.index);
            exit_price = tick.price;

            let change = change_pct(&position, tick.price);
            if change >= config.take_profit_pct {
                reason = ExitReason::TakeProfit;
                break;
            }
            if change <= -config.stop_loss_pct {
                reason = ExitReason::StopLoss;
                break;
            }
        }

        let profit_pct = change_pct(&position, exit_price);
        let profit = profit_pct / 100.0 * position.amount;
        log::info!(
            "Closed {} ({:?}) at {:.4}: profit {:.4} ({:.2}%)",
            position.order_id,
            reason,
            exit_price,
            profit,
            profit_pct
        );

        Ok(json!({
            "closed": true,
            "orderId": position.order_id,
            "pair": position.pair,
            "entryPrice": position.fill_price,
            "exitPrice": exit_price,
            "exitReason": reason,
            "profit": profit,
            "profitPct": profit_pct,
        }))
    }
}

#[async_trait]
impl CollectorService for TakeProfitCollector {
    async fn monitor(&self, inputs: &NodeInputs, config: &ResultCollectorConfig) -> ServiceResult {
        match self.collect(inputs, config) {
            Ok(result) => ServiceResult::success(result),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(prices: Vec<f64>, action: TradeAction) -> (TakeProfitCollector, NodeInputs) {
        let feed = Arc::new(ScriptedPriceFeed::new().with_script("SOL/USDC", prices));
        let book = Arc::new(PaperBook::new());
        let position = Position {
            order_id: book.next_order_id(),
            pair: "SOL/USDC".to_string(),
            action,
            fill_price: 100.0,
            quantity: 2.0,
            amount: 200.0,
        };
        book.open(position.clone());
        let inputs = NodeInputs::from([(
            "exec".to_string(),
            json!({"orderId": position.order_id, "filled": true, "amount": 200.0}),
        )]);
        (TakeProfitCollector::new(feed, book), inputs)
    }

    #[tokio::test]
    async fn test_take_profit_hit() {
        let (collector, inputs) = setup(vec![101.0, 103.0, 106.0, 90.0], TradeAction::Buy);
        let result = collector
            .monitor(&inputs, &ResultCollectorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["exitReason"], "take_profit");
        assert_eq!(result["exitPrice"], 106.0);
        assert!((result["profit"].as_f64().unwrap() - 12.0).abs() < 1e-9);
        assert!(collector.book.open_positions().is_empty());
    }

    #[tokio::test]
    async fn test_stop_loss_on_short() {
        let (collector, inputs) = setup(vec![101.0, 103.0], TradeAction::Sell);
        let result = collector
            .monitor(&inputs, &ResultCollectorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["exitReason"], "stop_loss");
        assert!((result["profit"].as_f64().unwrap() + 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_script_exhausted_closes_at_last_price() {
        let (collector, inputs) = setup(vec![100.5, 101.0], TradeAction::Buy);
        let result = collector
            .monitor(&inputs, &ResultCollectorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(result["exitReason"], "timeout");
        assert!((result["profit"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_window_limits_ticks() {
        let (collector, inputs) = setup(vec![100.0, 101.0, 110.0], TradeAction::Buy);
        let collector = collector.with_tick_secs(60);
        let config = ResultCollectorConfig {
            monitor_secs: 120,
            ..Default::default()
        };
        let result = collector.monitor(&inputs, &config).await.into_result().unwrap();
        assert_eq!(result["exitReason"], "timeout");
        assert_eq!(result["exitPrice"], 101.0);
    }

    #[tokio::test]
    async fn test_unfilled_trade_has_no_profit() {
        let (collector, _) = setup(vec![100.0], TradeAction::Buy);
        let inputs = NodeInputs::from([(
            "exec".to_string(),
            json!({"action": "hold", "filled": false, "amount": 0.0}),
        )]);
        let result = collector
            .monitor(&inputs, &ResultCollectorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(result, json!({"closed": false, "profit": 0.0}));
    }

    #[tokio::test]
    async fn test_missing_trade() {
        let (collector, _) = setup(vec![100.0], TradeAction::Buy);
        let result = collector
            .monitor(&NodeInputs::new(), &ResultCollectorConfig::default())
            .await;
        assert_eq!(result, ServiceResult::error("no filled trade among inputs"));
    }
}
