//! Simulated Executor
//!
//! Fills every actionable strategy immediately at the quoted price moved
//! against the trader by the configured slippage. Reports the traded
//! notional as `amount`; profit is realized later by the collector.

use std::sync::Arc;

use async_trait::async_trait;
use flow_engine::components::TradeExecutorConfig;
use flow_engine::{ExecutorService, NodeInputs, ServiceResult};
use serde_json::{json, Value};

use crate::book::{PaperBook, Position};
use crate::error::{PaperError, Result};
use crate::evaluator::{find_price, TradeAction};

/// Decision taken from the executor's inputs
#[derive(Debug, Clone, PartialEq)]
struct Order {
    action: TradeAction,
    price: f64,
}

/// An evaluator strategy wins over raw listener prices. A price listener
/// wired straight into the executor means "buy at market".
fn order_from_inputs(inputs: &NodeInputs) -> Result<Order> {
    let strategy = inputs.values().find_map(|value| {
        let action = TradeAction::from_value(value.get("action")?)?;
        Some((action, value.get("price").and_then(Value::as_f64)))
    });

    match strategy {
        Some((TradeAction::Hold, price)) => Ok(Order {
            action: TradeAction::Hold,
            price: price.unwrap_or(0.0),
        }),
        Some((action, Some(price))) => Ok(Order { action, price }),
        Some((_, None)) => Err(PaperError::MissingPrice),
        None => {
            let price = find_price(inputs).ok_or(PaperError::MissingPrice)?;
            Ok(Order {
                action: TradeAction::Buy,
                price: price.price,
            })
        }
    }
}

pub fn fill_price(action: TradeAction, price: f64, slippage_bps: u32) -> f64 {
    let slippage = f64::from(slippage_bps) / 10_000.0;
    match action {
        TradeAction::Buy => price * (1.0 + slippage),
        TradeAction::Sell => price * (1.0 - slippage),
        TradeAction::Hold => price,
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    book: Arc<PaperBook>,
}

impl SimulatedExecutor {
    pub fn new(book: Arc<PaperBook>) -> Self {
        Self { book }
    }

    fn execute(&self, inputs: &NodeInputs, config: &TradeExecutorConfig) -> Result<Value> {
        let order = order_from_inputs(inputs)?;

        if order.action == TradeAction::Hold {
            log::debug!("SimulatedExecutor: holding {}", config.pair);
            return Ok(json!({
                "action": TradeAction::Hold,
                "pair": config.pair,
                "filled": false,
                "amount": 0.0,
            }));
        }

        if !order.price.is_finite() || order.price <= 0.0 {
            return Err(PaperError::InvalidPrice(order.price));
        }

        let available = config.max_position - self.book.exposure(&config.pair);
        if config.amount > available {
            return Err(PaperError::PositionLimit {
                requested: config.amount,
                available: available.max(0.0),
            });
        }

        let fill = fill_price(order.action, order.price, config.slippage_bps);
        let position = Position {
            order_id: self.book.next_order_id(),
            pair: config.pair.clone(),
            action: order.action,
            fill_price: fill,
            quantity: config.amount / fill,
            amount: config.amount,
        };
        self.book.open(position.clone());

        log::info!(
            "Paper fill {}: {:?} {:.6} {} @ {:.4}",
            position.order_id,
            position.action,
            position.quantity,
            position.pair,
            position.fill_price
        );

        Ok(json!({
            "orderId": position.order_id,
            "action": position.action,
            "pair": position.pair,
            "filled": true,
            "price": order.price,
            "fillPrice": position.fill_price,
            "quantity": position.quantity,
            "amount": position.amount,
            "slippageBps": config.slippage_bps,
        }))
    }
}

#[async_trait]
impl ExecutorService for SimulatedExecutor {
    async fn submit(&self, strategy: &NodeInputs, config: &TradeExecutorConfig) -> ServiceResult {
        match self.execute(strategy, config) {
            Ok(trade) => ServiceResult::success(trade),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy(action: &str, price: f64) -> NodeInputs {
        NodeInputs::from([(
            "eval".to_string(),
            json!({"action": action, "symbol": "SOL/USDC", "price": price}),
        )])
    }

    #[test]
    fn test_slippage_moves_against_trader() {
        assert!((fill_price(TradeAction::Buy, 100.0, 50) - 100.5).abs() < 1e-9);
        assert!((fill_price(TradeAction::Sell, 100.0, 50) - 99.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_buy_is_filled_and_booked() {
        let book = Arc::new(PaperBook::new());
        let executor = SimulatedExecutor::new(book.clone());
        let trade = executor
            .submit(&strategy("buy", 100.0), &TradeExecutorConfig::default())
            .await
            .into_result()
            .unwrap();

        assert_eq!(trade["filled"], true);
        assert_eq!(trade["amount"], 100.0);
        assert_eq!(trade["orderId"], "paper-1");
        assert!((trade["fillPrice"].as_f64().unwrap() - 100.5).abs() < 1e-9);
        assert_eq!(book.exposure("SOL/USDC"), 100.0);
    }

    #[tokio::test]
    async fn test_hold_reports_zero_notional() {
        let book = Arc::new(PaperBook::new());
        let executor = SimulatedExecutor::new(book.clone());
        let trade = executor
            .submit(&strategy("hold", 100.0), &TradeExecutorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(trade["filled"], false);
        assert_eq!(trade["amount"], 0.0);
        assert!(book.open_positions().is_empty());
    }

    #[tokio::test]
    async fn test_raw_price_input_buys_at_market() {
        let executor = SimulatedExecutor::new(Arc::new(PaperBook::new()));
        let inputs = NodeInputs::from([(
            "price".to_string(),
            json!({"kind": "price", "symbol": "SOL/USDC", "price": 20.0, "momentum": 0.0}),
        )]);
        let trade = executor
            .submit(&inputs, &TradeExecutorConfig::default())
            .await
            .into_result()
            .unwrap();
        assert_eq!(trade["action"], "buy");
        assert_eq!(trade["price"], 20.0);
    }

    #[tokio::test]
    async fn test_position_limit() {
        let executor = SimulatedExecutor::new(Arc::new(PaperBook::new()));
        let config = TradeExecutorConfig {
            amount: 600.0,
            max_position: 1000.0,
            ..Default::default()
        };
        assert!(executor.submit(&strategy("buy", 10.0), &config).await.is_success());

        let second = executor.submit(&strategy("sell", 10.0), &config).await;
        assert_eq!(
            second,
            ServiceResult::error("position limit exceeded: 600 requested, 400 available")
        );
    }

    #[tokio::test]
    async fn test_no_usable_input() {
        let executor = SimulatedExecutor::new(Arc::new(PaperBook::new()));
        let result = executor
            .submit(&NodeInputs::new(), &TradeExecutorConfig::default())
            .await;
        assert!(!result.is_success());
    }
}
