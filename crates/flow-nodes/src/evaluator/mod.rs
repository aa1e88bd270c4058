//! Evaluator services

mod momentum;

pub(crate) use momentum::find_price;
pub use momentum::{MomentumEvaluator, TradeAction};
