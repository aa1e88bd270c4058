//! Flow Nodes
//!
//! Paper trading implementations of the node services a `flow-engine`
//! workflow runs against. Everything is deterministic and offline: prices
//! come from scripts, wallets from snapshots, fills are simulated.
//!
//! # Categories
//!
//! - **Listener**: scripted price feed and wallet snapshots
//! - **Evaluator**: momentum rule checked against the confidence threshold
//! - **Executor**: immediate fills with slippage, bounded by position size
//! - **Collector**: take-profit / stop-loss monitoring of open positions

pub mod book;
pub mod collector;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod listener;
pub mod paper;

pub use book::{PaperBook, Position};
pub use collector::{ExitReason, TakeProfitCollector};
pub use error::PaperError;
pub use evaluator::{MomentumEvaluator, TradeAction};
pub use executor::SimulatedExecutor;
pub use listener::{PaperListener, PriceTick, ScriptedPriceFeed, WalletSnapshot, WalletSnapshots};
pub use paper::{PaperConfig, PaperTrading};
