//! Error types for the paper services

use thiserror::Error;

use flow_engine::ServiceResult;

/// Failures of a paper service call
///
/// Services never return these to the engine directly; they are folded into
/// a `ServiceResult::Error` so the run records the message on the node.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaperError {
    #[error("no price script for symbol '{0}'")]
    UnknownSymbol(String),

    #[error("no wallet snapshot for '{chain}:{address}'")]
    UnknownWallet { chain: String, address: String },

    #[error("wallet address must not be empty")]
    EmptyAddress,

    #[error("no price data among inputs")]
    MissingPrice,

    #[error("no filled trade among inputs")]
    MissingTrade,

    #[error("position limit exceeded: {requested} requested, {available} available")]
    PositionLimit { requested: f64, available: f64 },

    #[error("invalid price {0}")]
    InvalidPrice(f64),
}

impl From<PaperError> for ServiceResult {
    fn from(err: PaperError) -> Self {
        ServiceResult::error(err.to_string())
    }
}

/// Result type for paper service internals
pub type Result<T> = std::result::Result<T, PaperError>;
