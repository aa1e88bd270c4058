//! Executor services

mod simulated;

pub use simulated::{fill_price, SimulatedExecutor};
