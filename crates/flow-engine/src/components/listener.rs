//! Listener components (data feeds)

use serde::{Deserialize, Serialize};

use crate::registry::{ComponentSchema, SchemaFn};
use crate::types::{ComponentType, PortMode};

/// Configuration for a price feed listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PriceListenerConfig {
    /// Trading pair to watch (e.g., "SOL/USDC")
    pub symbol: String,
    /// Name of the price source the listener service should use
    pub source: String,
    /// Polling interval
    pub interval_secs: u64,
}

impl Default for PriceListenerConfig {
    fn default() -> Self {
        Self {
            symbol: "SOL/USDC".to_string(),
            source: "paper".to_string(),
            interval_secs: 60,
        }
    }
}

impl PriceListenerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("symbol must not be empty".to_string());
        }
        if self.interval_secs == 0 {
            return Err("intervalSecs must be positive".to_string());
        }
        Ok(())
    }
}

/// Configuration for a wallet balance listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WalletListenerConfig {
    /// Wallet address to watch
    pub address: String,
    /// Chain the wallet lives on
    pub chain: String,
}

impl Default for WalletListenerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            chain: "solana".to_string(),
        }
    }
}

impl WalletListenerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chain.trim().is_empty() {
            return Err("chain must not be empty".to_string());
        }
        Ok(())
    }
}

pub fn price_listener_schema() -> ComponentSchema {
    ComponentSchema::new(
        ComponentType::PriceListener,
        "Price Listener",
        "Fetches market prices for a trading pair",
    )
    .inputs(PortMode::Single, &[ComponentType::Start])
    .outputs(
        PortMode::Multi,
        &[
            ComponentType::AiEvaluator,
            ComponentType::TradeExecutor,
            ComponentType::End,
        ],
    )
    .with_default_config(serde_json::to_value(PriceListenerConfig::default()).unwrap_or_default())
}

/// The listed `TradeExecutor` output is not mirrored in the executor's
/// inputs, so that edge is never accepted.
pub fn wallet_listener_schema() -> ComponentSchema {
    ComponentSchema::new(
        ComponentType::WalletListener,
        "Wallet Listener",
        "Watches balances of an on-chain wallet",
    )
    .inputs(PortMode::Single, &[ComponentType::Start])
    .outputs(
        PortMode::Multi,
        &[
            ComponentType::AiEvaluator,
            ComponentType::TradeExecutor,
            ComponentType::End,
        ],
    )
    .with_default_config(serde_json::to_value(WalletListenerConfig::default()).unwrap_or_default())
}

inventory::submit!(SchemaFn(price_listener_schema));
inventory::submit!(SchemaFn(wallet_listener_schema));
