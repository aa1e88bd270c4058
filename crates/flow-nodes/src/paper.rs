//! Paper trading setup for host applications.
//!
//! Hosts without real exchange, chain or model integrations build a
//! [`PaperTrading`] bundle and hand its [`NodeServices`] to the execution
//! engine. The listener, executor and collector share one price feed and
//! one order book, so a run's entry and exit prices come from the same
//! series.
//!
//! # Example
//!
//! ```ignore
//! let paper = flow_nodes::PaperTrading::from_config(&PaperConfig::load(path).await?);
//! let engine = flow_engine::ExecutionEngine::new(paper.services());
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use flow_engine::{NodeServices, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::book::PaperBook;
use crate::collector::TakeProfitCollector;
use crate::evaluator::MomentumEvaluator;
use crate::executor::SimulatedExecutor;
use crate::listener::{PaperListener, ScriptedPriceFeed, WalletSnapshot, WalletSnapshots};

/// File-loadable description of a paper market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperConfig {
    /// Price script per symbol
    pub prices: BTreeMap<String, Vec<f64>>,
    pub wallets: Vec<WalletSnapshot>,
    /// Relative move at which the evaluator is fully confident
    pub full_confidence_move: f64,
    /// Simulated seconds between collector price checks
    pub tick_secs: u64,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            prices: BTreeMap::new(),
            wallets: Vec::new(),
            full_confidence_move: 0.02,
            tick_secs: 60,
        }
    }
}

impl PaperConfig {
    /// Load from a JSON file; a missing file yields the defaults
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await? {
            log::debug!("No paper config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).await?;
        let config = serde_json::from_str(&contents)?;
        log::info!("Loaded paper market from {:?}", path);
        Ok(config)
    }
}

/// Shared state and services of one paper market
#[derive(Debug, Clone)]
pub struct PaperTrading {
    prices: Arc<ScriptedPriceFeed>,
    book: Arc<PaperBook>,
    listener: Arc<PaperListener>,
    evaluator: Arc<MomentumEvaluator>,
    executor: Arc<SimulatedExecutor>,
    collector: Arc<TakeProfitCollector>,
}

impl PaperTrading {
    pub fn new(prices: ScriptedPriceFeed, wallets: WalletSnapshots) -> Self {
        Self::assemble(prices, wallets, MomentumEvaluator::default(), 60)
    }

    pub fn from_config(config: &PaperConfig) -> Self {
        let prices = config
            .prices
            .iter()
            .fold(ScriptedPriceFeed::new(), |feed, (symbol, script)| {
                feed.with_script(symbol.clone(), script.clone())
            });
        let wallets = config.wallets.iter().cloned().collect();
        Self::assemble(
            prices,
            wallets,
            MomentumEvaluator::new(config.full_confidence_move),
            config.tick_secs,
        )
    }

    fn assemble(
        prices: ScriptedPriceFeed,
        wallets: WalletSnapshots,
        evaluator: MomentumEvaluator,
        tick_secs: u64,
    ) -> Self {
        let prices = Arc::new(prices);
        let book = Arc::new(PaperBook::new());
        Self {
            listener: Arc::new(PaperListener::new(Arc::clone(&prices), wallets)),
            evaluator: Arc::new(evaluator),
            executor: Arc::new(SimulatedExecutor::new(Arc::clone(&book))),
            collector: Arc::new(
                TakeProfitCollector::new(Arc::clone(&prices), Arc::clone(&book))
                    .with_tick_secs(tick_secs),
            ),
            prices,
            book,
        }
    }

    pub fn prices(&self) -> &ScriptedPriceFeed {
        &self.prices
    }

    pub fn book(&self) -> &PaperBook {
        &self.book
    }

    /// Service bundle for the execution engine
    pub fn services(&self) -> NodeServices {
        NodeServices::new(
            self.listener.clone(),
            self.evaluator.clone(),
            self.executor.clone(),
            self.collector.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_accepts_partial_json() {
        let config: PaperConfig =
            serde_json::from_str(r#"{"prices": {"SOL/USDC": [100.0, 101.0]}}"#).unwrap();
        assert_eq!(config.prices["SOL/USDC"], vec![100.0, 101.0]);
        assert_eq!(config.tick_secs, 60);
        assert!(config.wallets.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = PaperConfig::load(&temp.path().join("paper.json")).await.unwrap();
        assert_eq!(config, PaperConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("paper.json");
        let contents = serde_json::json!({
            "prices": {"ETH/USDC": [3000.0]},
            "wallets": [{"chain": "solana", "address": "7xKX", "balances": {"SOL": 1.0}}],
            "tickSecs": 30,
        });
        tokio::fs::write(&path, contents.to_string()).await.unwrap();

        let config = PaperConfig::load(&path).await.unwrap();
        assert_eq!(config.tick_secs, 30);

        let paper = PaperTrading::from_config(&config);
        assert_eq!(paper.prices().symbols().collect::<Vec<_>>(), vec!["ETH/USDC"]);
        assert!(paper.book().open_positions().is_empty());
    }
}
