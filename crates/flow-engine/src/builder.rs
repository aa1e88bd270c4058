//! Fluent builder for workflow graphs
//!
//! Provides a fluent API for constructing workflows programmatically, mostly
//! for tests and seeded templates. Connections added here are not checked;
//! run `validate_workflow` on the result when that matters.

use crate::components::NodeConfig;
use crate::graph::{Connection, Node, Workflow};
use crate::types::{ComponentType, Position};

/// Fluent builder for constructing workflows
///
/// # Example
///
/// ```ignore
/// let workflow = WorkflowBuilder::new("wf-1", "Momentum")
///     .add_node("start", ComponentType::Start, (0.0, 0.0))
///     .add_node("price", ComponentType::PriceListener, (250.0, 0.0))
///     .with_config(NodeConfig::PriceListener(PriceListenerConfig {
///         symbol: "ETH/USDC".into(),
///         ..Default::default()
///     }))
///     .add_node("end", ComponentType::End, (500.0, 0.0))
///     .connect("start", "price")
///     .connect("price", "end")
///     .build();
/// ```
pub struct WorkflowBuilder {
    id: String,
    name: String,
    description: Option<String>,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    connection_counter: usize,
}

impl WorkflowBuilder {
    /// Create a new workflow builder
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            connection_counter: 0,
        }
    }

    /// Set the workflow description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a node with the default configuration of its type
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        component_type: ComponentType,
        position: (f64, f64),
    ) -> Self {
        self.nodes.push(Node::new(
            id,
            NodeConfig::default_for(component_type),
            Position::new(position.0, position.1),
        ));
        self
    }

    /// Set the configuration of the most recently added node
    ///
    /// Must be called immediately after `add_node`. A configuration of a
    /// different component type is ignored.
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            if let Err(e) = node.set_config(config) {
                log::warn!("Ignoring configuration for node '{}': {}", node.id, e);
            }
        }
        self
    }

    /// Add a connection (auto-generates the connection ID)
    pub fn connect(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.connection_counter += 1;
        self.connections.push(Connection::new(
            format!("conn-{}", self.connection_counter),
            source,
            target,
        ));
        self
    }

    /// Add a connection with an explicit ID
    pub fn connect_with_id(
        mut self,
        connection_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.connections
            .push(Connection::new(connection_id, source, target));
        self
    }

    /// Build the workflow without validation
    pub fn build(self) -> Workflow {
        let mut workflow = Workflow::new(self.id, self.name);
        workflow.description = self.description;
        workflow.nodes = self.nodes;
        workflow.connections = self.connections;
        workflow
    }
}
