//! Wallet Snapshots
//!
//! Static token balances keyed by chain and address.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PaperError, Result};

/// Balances of one wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub chain: String,
    pub address: String,
    /// Token symbol to balance
    #[serde(default)]
    pub balances: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct WalletSnapshots {
    wallets: HashMap<(String, String), WalletSnapshot>,
}

impl WalletSnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, snapshot: WalletSnapshot) {
        let key = (snapshot.chain.clone(), snapshot.address.clone());
        self.wallets.insert(key, snapshot);
    }

    pub fn with_snapshot(mut self, snapshot: WalletSnapshot) -> Self {
        self.insert(snapshot);
        self
    }

    pub fn get(&self, chain: &str, address: &str) -> Result<&WalletSnapshot> {
        if address.trim().is_empty() {
            return Err(PaperError::EmptyAddress);
        }
        self.wallets
            .get(&(chain.to_string(), address.to_string()))
            .ok_or_else(|| PaperError::UnknownWallet {
                chain: chain.to_string(),
                address: address.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl FromIterator<WalletSnapshot> for WalletSnapshots {
    fn from_iter<I: IntoIterator<Item = WalletSnapshot>>(iter: I) -> Self {
        let mut snapshots = Self::new();
        for snapshot in iter {
            snapshots.insert(snapshot);
        }
        snapshots
    }
}
