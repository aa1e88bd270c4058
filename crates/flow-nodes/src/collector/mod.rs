//! Collector services

mod take_profit;

pub use take_profit::{change_pct, ExitReason, TakeProfitCollector};
