//! Paper order book
//!
//! Open positions shared between the simulated executor (which opens them)
//! and the result collector (which closes them). Exposure per pair is the
//! sum of the notional of its open positions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::evaluator::TradeAction;

/// A filled paper trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub order_id: String,
    pub pair: String,
    pub action: TradeAction,
    pub fill_price: f64,
    pub quantity: f64,
    /// Notional in quote currency
    pub amount: f64,
}

#[derive(Debug, Default)]
pub struct PaperBook {
    next_order: AtomicU64,
    open: Mutex<HashMap<String, Position>>,
}

impl PaperBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_order_id(&self) -> String {
        format!("paper-{}", self.next_order.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Notional currently open on a pair
    pub fn exposure(&self, pair: &str) -> f64 {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| p.pair == pair)
            .map(|p| p.amount)
            .sum()
    }

    pub fn open(&self, position: Position) {
        log::debug!(
            "Opened {} {:?} {} @ {}",
            position.order_id,
            position.action,
            position.pair,
            position.fill_price
        );
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(position.order_id.clone(), position);
    }

    /// Remove a position; `None` when it was never opened or already closed
    pub fn close(&self, order_id: &str) -> Option<Position> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(order_id)
    }

    pub fn open_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(book: &PaperBook, pair: &str, amount: f64) -> Position {
        Position {
            order_id: book.next_order_id(),
            pair: pair.to_string(),
            action: TradeAction::Buy,
            fill_price: 10.0,
            quantity: amount / 10.0,
            amount,
        }
    }

    #[test]
    fn test_exposure_tracks_open_positions() {
        let book = PaperBook::new();
        let first = position(&book, "SOL/USDC", 100.0);
        let second = position(&book, "SOL/USDC", 50.0);
        let other = position(&book, "ETH/USDC", 70.0);
        assert_eq!(first.order_id, "paper-1");

        book.open(first.clone());
        book.open(second);
        book.open(other);
        assert_eq!(book.exposure("SOL/USDC"), 150.0);

        assert_eq!(book.close(&first.order_id), Some(first.clone()));
        assert_eq!(book.close(&first.order_id), None);
        assert_eq!(book.exposure("SOL/USDC"), 50.0);
        assert_eq!(book.open_positions().len(), 2);
    }
}
