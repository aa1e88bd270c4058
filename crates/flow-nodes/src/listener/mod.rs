//! Listener services
//!
//! - `price_feed`: scripted per-symbol price series
//! - `wallet`: static wallet balance snapshots

mod price_feed;
mod wallet;

pub use price_feed::{PriceTick, ScriptedPriceFeed};
pub use wallet::{WalletSnapshot, WalletSnapshots};

use std::sync::Arc;

use async_trait::async_trait;
use flow_engine::{ListenerService, ListenerSource, ServiceResult};
use serde_json::json;

/// Listener backed by a scripted price feed and wallet snapshots
///
/// # Outputs
/// - price: `{kind: "price", symbol, source, price, previous, momentum, tick}`
/// - wallet: `{kind: "wallet", chain, address, balances}`
#[derive(Debug, Clone)]
pub struct PaperListener {
    prices: Arc<ScriptedPriceFeed>,
    wallets: WalletSnapshots,
}

impl PaperListener {
    pub fn new(prices: Arc<ScriptedPriceFeed>, wallets: WalletSnapshots) -> Self {
        Self { prices, wallets }
    }

    pub fn prices(&self) -> &Arc<ScriptedPriceFeed> {
        &self.prices
    }
}

#[async_trait]
impl ListenerService for PaperListener {
    async fn fetch_or_stream(&self, source: ListenerSource<'_>) -> ServiceResult {
        match source {
            ListenerSource::Price(config) => match self.prices.tick(&config.symbol) {
                Ok(tick) => {
                    log::debug!(
                        "PaperListener: {} @ {} (tick {})",
                        config.symbol,
                        tick.price,
                        tick.index
                    );
                    ServiceResult::success(json!({
                        "kind": "price",
                        "symbol": config.symbol,
                        "source": config.source,
                        "price": tick.price,
                        "previous": tick.previous,
                        "momentum": tick.momentum(),
                        "tick": tick.index,
                    }))
                }
                Err(e) => e.into(),
            },
            ListenerSource::Wallet(config) => {
                match self.wallets.get(&config.chain, &config.address) {
                    Ok(snapshot) => ServiceResult::success(json!({
                        "kind": "wallet",
                        "chain": snapshot.chain,
                        "address": snapshot.address,
                        "balances": snapshot.balances,
                    })),
                    Err(e) => e.into(),
                }
            }
        }
    }
}
