//! Error types for the flow engine

use thiserror::Error;

use crate::validation::ConnectionRejection;

/// Result type alias using FlowEngineError
pub type Result<T> = std::result::Result<T, FlowEngineError>;

/// Errors that can occur in the flow engine
#[derive(Debug, Error)]
pub enum FlowEngineError {
    /// Component type is not present in the registry
    #[error("Unknown component type: {0}")]
    UnknownType(String),

    /// A candidate edge was rejected by the connection validator
    #[error("Invalid connection: {0}")]
    InvalidConnection(ConnectionRejection),

    /// Node configuration does not match its component type
    #[error("Invalid configuration for '{component}': {reason}")]
    InvalidConfig { component: String, reason: String },

    /// An external node service call failed
    #[error("Node '{node_id}' failed: {message}")]
    NodeExecution { node_id: String, message: String },

    /// Saving or loading a workflow or run failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Referenced workflow, run or node does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Workflow graph contains a cycle
    #[error("Cycle detected in workflow graph")]
    CycleDetected,

    /// Run queue worker is gone
    #[error("Run queue is closed")]
    QueueClosed,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowEngineError {
    /// Create a persistence error with a message
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a not-found error with a message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            component: component.into(),
            reason: reason.into(),
        }
    }
}
