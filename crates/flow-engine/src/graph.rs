//! Workflow graph model
//!
//! Nodes, connections and the workflow document that holds them. A workflow
//! is persisted as one nested JSON document (nodes, connections, status and
//! viewport together).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::NodeConfig;
use crate::error::{FlowEngineError, Result};
use crate::registry::ComponentRegistry;
use crate::types::{
    ComponentType, ConnectionId, LogEntry, NodeId, NodeRunStatus, NodeStatus, Position,
    WorkflowId, WorkflowStatus,
};
use crate::validation::check_connection;

/// A node instance in a workflow
///
/// The component type is carried by the configuration variant, so a node's
/// type and configuration shape can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeDocument", into = "NodeDocument")]
pub struct Node {
    /// Unique identifier within the workflow
    pub id: NodeId,
    /// Position of the node's top-left corner in graph space
    pub position: Position,
    /// Design-time preview status
    pub status: NodeStatus,
    /// Run status, only set while replaying a run
    pub run_status: Option<NodeRunStatus>,
    /// Run log, only set while replaying a run
    pub logs: Vec<LogEntry>,
    config: NodeConfig,
}

impl Node {
    /// Create a node from a typed configuration
    pub fn new(id: impl Into<String>, config: NodeConfig, position: Position) -> Self {
        Self {
            id: id.into(),
            position,
            status: NodeStatus::Idle,
            run_status: None,
            logs: Vec::new(),
            config,
        }
    }

    /// The node's component type
    pub fn component_type(&self) -> ComponentType {
        self.config.component_type()
    }

    /// The node's configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Replace the configuration; the new configuration must be valid and of the same type
    pub fn set_config(&mut self, config: NodeConfig) -> Result<()> {
        if config.component_type() != self.component_type() {
            return Err(FlowEngineError::invalid_config(
                self.component_type().as_str(),
                format!("cannot apply {} configuration", config.component_type()),
            ));
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

/// Serialized shape of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeDocument {
    id: NodeId,
    #[serde(rename = "type")]
    node_type: String,
    position: Position,
    #[serde(default)]
    config: serde_json::Value,
    #[serde(default)]
    status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_status: Option<NodeRunStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    logs: Vec<LogEntry>,
}

impl TryFrom<NodeDocument> for Node {
    type Error = FlowEngineError;

    fn try_from(doc: NodeDocument) -> Result<Self> {
        let component_type: ComponentType = doc.node_type.parse()?;
        let config = NodeConfig::from_value(component_type, doc.config)?;
        Ok(Node {
            id: doc.id,
            position: doc.position,
            status: doc.status,
            run_status: doc.run_status,
            logs: doc.logs,
            config,
        })
    }
}

impl From<Node> for NodeDocument {
    fn from(node: Node) -> Self {
        NodeDocument {
            id: node.id,
            node_type: node.config.component_type().to_string(),
            position: node.position,
            config: node.config.to_value().unwrap_or_default(),
            status: node.status,
            run_status: node.run_status,
            logs: node.logs,
        }
    }
}

/// A directed link from one node's output to another node's input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Saved canvas viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedViewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for SavedViewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// A complete workflow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier, empty until first saved
    #[serde(default)]
    pub id: WorkflowId,
    /// Human-readable name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Nodes in insertion order
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Connections between nodes
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Lifecycle status
    #[serde(default)]
    pub status: WorkflowStatus,
    /// Canvas viewport when last saved
    #[serde(default)]
    pub viewport: SavedViewport,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a new empty workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            status: WorkflowStatus::Draft,
            viewport: SavedViewport::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Parse a persisted workflow document
    pub fn from_document(document: &str) -> Result<Self> {
        let workflow: Workflow = serde_json::from_str(document)?;
        let mut seen = HashSet::new();
        for node in &workflow.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(FlowEngineError::persistence(format!(
                    "duplicate node id '{}' in workflow '{}'",
                    node.id, workflow.id
                )));
            }
        }
        Ok(workflow)
    }

    /// Serialize to a persisted workflow document
    pub fn to_document(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Mark the workflow as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Check if a node exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Add a node of the given type with its default configuration.
    ///
    /// Returns the generated node ID.
    pub fn add_node(
        &mut self,
        registry: &ComponentRegistry,
        component_type: ComponentType,
        position: Position,
    ) -> Result<NodeId> {
        let config = registry.default_config(component_type)?;
        let id = format!("{}-{}", component_type, uuid::Uuid::new_v4().simple());
        self.nodes.push(Node::new(id.clone(), config, position));
        self.touch();
        log::debug!("Added {} node '{}' to workflow '{}'", component_type, id, self.id);
        Ok(id)
    }

    /// Insert a fully built node; its ID must be unused
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.contains_node(&node.id) {
            return Err(FlowEngineError::invalid_config(
                node.component_type().as_str(),
                format!("node id '{}' already exists", node.id),
            ));
        }
        self.nodes.push(node);
        self.touch();
        Ok(())
    }

    /// Remove a node and every connection touching it.
    ///
    /// Returns the removed node together with the removed connections.
    pub fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<Connection>)> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(pos);

        let (removed, kept): (Vec<Connection>, Vec<Connection>) = self
            .connections
            .drain(..)
            .partition(|c| c.source == id || c.target == id);
        self.connections = kept;
        self.touch();

        log::debug!(
            "Removed node '{}' and {} connection(s) from workflow '{}'",
            id,
            removed.len(),
            self.id
        );
        Some((node, removed))
    }

    /// Move a node to a new graph-space position
    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        match self.find_node_mut(id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    /// Replace a node's configuration
    pub fn update_config(&mut self, id: &str, config: NodeConfig) -> Result<()> {
        let node = self
            .find_node_mut(id)
            .ok_or_else(|| FlowEngineError::not_found(format!("node '{}'", id)))?;
        node.set_config(config)?;
        self.touch();
        Ok(())
    }

    /// Connect two nodes after validating the edge.
    ///
    /// Returns the new connection ID, or `InvalidConnection` with the reason
    /// the edge was rejected.
    pub fn connect(
        &mut self,
        registry: &ComponentRegistry,
        source: &str,
        target: &str,
    ) -> Result<ConnectionId> {
        check_connection(self, registry, source, target)
            .map_err(FlowEngineError::InvalidConnection)?;

        let id = format!("conn-{}", uuid::Uuid::new_v4().simple());
        self.connections.push(Connection::new(id.clone(), source, target));
        self.touch();
        Ok(id)
    }

    /// Remove a connection by ID
    pub fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let pos = self.connections.iter().position(|c| c.id == id)?;
        let connection = self.connections.remove(pos);
        self.touch();
        Some(connection)
    }

    /// Check whether an edge source -> target exists
    pub fn has_connection(&self, source: &str, target: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.source == source && c.target == target)
    }

    /// Get connections coming into a node
    pub fn incoming_connections<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.target == node_id)
    }

    /// Get connections going out of a node
    pub fn outgoing_connections<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source == node_id)
    }

    /// Get the IDs of nodes that this node depends on (upstream nodes)
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_connections(node_id)
            .map(|c| c.source.clone())
            .collect()
    }

    /// Get the IDs of nodes that depend on this node (downstream nodes)
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_connections(node_id)
            .map(|c| c.target.clone())
            .collect()
    }

    /// Reset every node's preview and replay state
    pub fn clear_run_overlay(&mut self) {
        for node in &mut self.nodes {
            node.status = NodeStatus::Idle;
            node.run_status = None;
            node.logs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{PriceListenerConfig, StartConfig};

    fn chain() -> (ComponentRegistry, Workflow, NodeId, NodeId, NodeId) {
        let registry = ComponentRegistry::with_builtins();
        let mut wf = Workflow::new("wf", "Chain");
        let start = wf
            .add_node(&registry, ComponentType::Start, Position::new(0.0, 0.0))
            .unwrap();
        let listener = wf
            .add_node(&registry, ComponentType::PriceListener, Position::new(250.0, 0.0))
            .unwrap();
        let end = wf
            .add_node(&registry, ComponentType::End, Position::new(500.0, 0.0))
            .unwrap();
        wf.connect(&registry, &start, &listener).unwrap();
        wf.connect(&registry, &listener, &end).unwrap();
        (registry, wf, start, listener, end)
    }

    #[test]
    fn test_add_node_copies_default_config() {
        let registry = ComponentRegistry::with_builtins();
        let mut wf = Workflow::new("wf", "Test");
        let id = wf
            .add_node(&registry, ComponentType::PriceListener, Position::new(10.0, 20.0))
            .unwrap();

        let node = wf.find_node(&id).unwrap();
        assert_eq!(node.component_type(), ComponentType::PriceListener);
        assert_eq!(node.config(), &NodeConfig::PriceListener(PriceListenerConfig::default()));
        assert_eq!(node.position, Position::new(10.0, 20.0));
        assert!(id.starts_with("price-listener-"));
    }

    #[test]
    fn test_add_node_unknown_type() {
        let registry = ComponentRegistry::new();
        let mut wf = Workflow::new("wf", "Test");
        let err = wf
            .add_node(&registry, ComponentType::Start, Position::default())
            .unwrap_err();
        assert!(matches!(err, FlowEngineError::UnknownType(_)));
        assert!(wf.nodes.is_empty());
    }

    #[test]
    fn test_remove_node_cascades_exactly() {
        let (registry, mut wf, start, listener, end) = chain();
        let other = wf
            .add_node(&registry, ComponentType::WalletListener, Position::new(250.0, 150.0))
            .unwrap();
        wf.connect(&registry, &start, &other).unwrap();
        wf.connect(&registry, &other, &end).unwrap();
        assert_eq!(wf.connections.len(), 4);

        let (node, removed) = wf.remove_node(&listener).unwrap();
        assert_eq!(node.id, listener);
        assert_eq!(removed.len(), 2);
        assert!(removed.iter().all(|c| c.source == listener || c.target == listener));

        assert_eq!(wf.connections.len(), 2);
        assert!(wf.has_connection(&start, &other));
        assert!(wf.has_connection(&other, &end));
    }

    #[test]
    fn test_connect_rejections_surface_as_invalid_connection() {
        let (registry, mut wf, start, listener, _end) = chain();
        let err = wf.connect(&registry, &start, &listener).unwrap_err();
        assert!(matches!(err, FlowEngineError::InvalidConnection(_)));
        let err = wf.connect(&registry, &listener, &listener).unwrap_err();
        assert!(matches!(err, FlowEngineError::InvalidConnection(_)));
        assert_eq!(wf.connections.len(), 2);
    }

    #[test]
    fn test_dependencies() {
        let (_registry, wf, start, listener, end) = chain();
        assert_eq!(wf.get_dependencies(&listener), vec![start.clone()]);
        assert_eq!(wf.get_dependents(&listener), vec![end]);
        assert!(wf.get_dependencies(&start).is_empty());
    }

    #[test]
    fn test_document_round_trip() {
        let (_registry, wf, _start, listener, _end) = chain();
        let document = wf.to_document().unwrap();
        assert!(document.contains("\"type\": \"price-listener\""));

        let restored = Workflow::from_document(&document).unwrap();
        assert_eq!(restored.nodes, wf.nodes);
        assert_eq!(restored.connections, wf.connections);
        assert_eq!(
            restored.find_node(&listener).unwrap().component_type(),
            ComponentType::PriceListener
        );
    }

    #[test]
    fn test_document_with_unknown_type_fails() {
        let document = serde_json::json!({
            "id": "wf",
            "name": "Broken",
            "nodes": [{"id": "a", "type": "futures-executor", "position": {"x": 0.0, "y": 0.0}}],
            "connections": [],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        })
        .to_string();
        let err = Workflow::from_document(&document).unwrap_err();
        assert!(err.to_string().contains("futures-executor"));
    }

    #[test]
    fn test_document_with_duplicate_node_ids_fails() {
        let mut wf = Workflow::new("wf", "Dupes");
        for _ in 0..2 {
            let config = NodeConfig::Start(StartConfig::default());
            wf.nodes.push(Node::new("a", config, Position::default()));
        }
        let document = wf.to_document().unwrap();
        assert!(matches!(
            Workflow::from_document(&document),
            Err(FlowEngineError::Persistence(_))
        ));
    }

    #[test]
    fn test_update_config_type_mismatch() {
        let (_registry, mut wf, start, _listener, _end) = chain();
        let err = wf
            .update_config(&start, NodeConfig::PriceListener(PriceListenerConfig::default()))
            .unwrap_err();
        assert!(matches!(err, FlowEngineError::InvalidConfig { .. }));

        let scheduled = StartConfig {
            trigger: crate::types::RunType::Scheduled,
            interval_secs: Some(60),
        };
        wf.update_config(&start, NodeConfig::Start(scheduled.clone())).unwrap();
        assert_eq!(wf.find_node(&start).unwrap().config(), &NodeConfig::Start(scheduled));
    }
}
