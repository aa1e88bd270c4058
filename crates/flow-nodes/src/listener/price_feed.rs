//! Scripted Price Feed
//!
//! Replays a fixed price series per symbol. Each tick advances the symbol's
//! cursor by one; once the script is exhausted the last price repeats.
//! The same feed is shared by the listener (entry prices) and the result
//! collector (exit prices), so a run walks one continuous series.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{PaperError, Result};

/// One observation from the feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    pub price: f64,
    /// Price of the preceding tick (equal to `price` on the first tick)
    pub previous: f64,
    /// Zero-based index of this tick in the script
    pub index: usize,
}

impl PriceTick {
    /// Relative change from the previous tick
    pub fn momentum(&self) -> f64 {
        if self.previous > 0.0 {
            (self.price - self.previous) / self.previous
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedPriceFeed {
    scripts: HashMap<String, Vec<f64>>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl ScriptedPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the price series for a symbol
    pub fn with_script(mut self, symbol: impl Into<String>, prices: Vec<f64>) -> Self {
        let symbol = symbol.into();
        if prices.is_empty() {
            log::warn!("Ignoring empty price script for '{}'", symbol);
            return self;
        }
        self.scripts.insert(symbol, prices);
        self
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    /// Read the next price for a symbol and advance its cursor
    pub fn tick(&self, symbol: &str) -> Result<PriceTick> {
        let script = self
            .scripts
            .get(symbol)
            .ok_or_else(|| PaperError::UnknownSymbol(symbol.to_string()))?;

        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        let cursor = cursors.entry(symbol.to_string()).or_insert(0);
        let index = (*cursor).min(script.len() - 1);
        let price = script[index];
        let previous = if index > 0 { script[index - 1] } else { price };
        if *cursor < script.len() {
            *cursor += 1;
        }

        if !price.is_finite() || price <= 0.0 {
            return Err(PaperError::InvalidPrice(price));
        }
        log::trace!("Price tick {} for '{}': {}", index, symbol, price);
        Ok(PriceTick {
            price,
            previous,
            index,
        })
    }

    /// Rewind every symbol to the start of its script
    pub fn reset(&self) {
        self.cursors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
