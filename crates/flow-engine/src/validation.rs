//! Connection and workflow validation
//!
//! `can_connect` is the pure compatibility check between two component
//! types. `check_connection` adds the structural rules a concrete edge must
//! satisfy, and `validate_workflow` reports every problem in a whole graph.
//!
//! The target's `input_connectables` is authoritative: an edge is legal only
//! when the source type is listed there, whatever the source's
//! `output_connectables` says.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::graph::Workflow;
use crate::registry::ComponentRegistry;
use crate::types::{ComponentType, PortMode};

/// Whether a `source_type` node may feed a `target_type` node
pub fn can_connect(
    registry: &ComponentRegistry,
    source_type: ComponentType,
    target_type: ComponentType,
) -> bool {
    registry
        .get_schema(target_type)
        .map(|schema| schema.accepts_input_from(source_type))
        .unwrap_or(false)
}

/// Component types a `source_type` node could be connected to.
///
/// Intersects the source's advertised outputs with each target's accepted
/// inputs, so one-sided declarations are not offered.
pub fn suggested_targets(
    registry: &ComponentRegistry,
    source_type: ComponentType,
) -> Vec<ComponentType> {
    let Ok(source) = registry.get_schema(source_type) else {
        return Vec::new();
    };
    source
        .output_connectables
        .iter()
        .copied()
        .filter(|target| can_connect(registry, source_type, *target))
        .collect()
}

/// Reason a candidate edge was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionRejection {
    #[error("node '{0}' cannot connect to itself")]
    SelfLoop(String),

    #[error("node '{0}' does not exist")]
    UnknownNode(String),

    #[error("connection {from} -> {to} already exists")]
    Duplicate { from: String, to: String },

    #[error("{source_type} cannot feed {target_type}")]
    Incompatible {
        source_type: ComponentType,
        target_type: ComponentType,
    },

    #[error("input of node '{0}' accepts a single connection")]
    InputOccupied(String),

    #[error("output of node '{0}' accepts a single connection")]
    OutputOccupied(String),
}

/// Check whether `source -> target` may be added to the workflow
pub fn check_connection(
    workflow: &Workflow,
    registry: &ComponentRegistry,
    source: &str,
    target: &str,
) -> Result<(), ConnectionRejection> {
    if source == target {
        return Err(ConnectionRejection::SelfLoop(source.to_string()));
    }

    let source_node = workflow
        .find_node(source)
        .ok_or_else(|| ConnectionRejection::UnknownNode(source.to_string()))?;
    let target_node = workflow
        .find_node(target)
        .ok_or_else(|| ConnectionRejection::UnknownNode(target.to_string()))?;

    if workflow.has_connection(source, target) {
        return Err(ConnectionRejection::Duplicate {
            from: source.to_string(),
            to: target.to_string(),
        });
    }

    let source_type = source_node.component_type();
    let target_type = target_node.component_type();
    if !can_connect(registry, source_type, target_type) {
        return Err(ConnectionRejection::Incompatible {
            source_type,
            target_type,
        });
    }

    // The source schema may be missing from a partial registry.
    if let Ok(target_schema) = registry.get_schema(target_type) {
        if target_schema.input_mode == PortMode::Single
            && workflow.incoming_connections(target).next().is_some()
        {
            return Err(ConnectionRejection::InputOccupied(target.to_string()));
        }
    }
    if let Ok(source_schema) = registry.get_schema(source_type) {
        if source_schema.output_mode == PortMode::Single
            && workflow.outgoing_connections(source).next().is_some()
        {
            return Err(ConnectionRejection::OutputOccupied(source.to_string()));
        }
    }

    Ok(())
}

/// Validation error with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Cycle detected in the graph
    CycleDetected,
    /// A node type is not in the registry
    UnknownNodeType { node_id: String, node_type: ComponentType },
    /// A connection references a non-existent node
    UnknownNode { connection_id: String, node_id: String },
    /// A connection joins incompatible component types
    IncompatibleConnection {
        connection_id: String,
        source_type: ComponentType,
        target_type: ComponentType,
    },
    /// Workflow has no Start node
    MissingStartNode,
    /// Workflow has more than one Start node
    MultipleStartNodes,
    /// Workflow has no End node
    MissingEndNode,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "Cycle detected in workflow"),
            Self::UnknownNodeType { node_id, node_type } => {
                write!(f, "Unknown component type '{}' for node '{}'", node_type, node_id)
            }
            Self::UnknownNode {
                connection_id,
                node_id,
            } => {
                write!(
                    f,
                    "Connection '{}' references unknown node '{}'",
                    connection_id, node_id
                )
            }
            Self::IncompatibleConnection {
                connection_id,
                source_type,
                target_type,
            } => {
                write!(
                    f,
                    "Connection '{}' joins incompatible types: {} -> {}",
                    connection_id, source_type, target_type
                )
            }
            Self::MissingStartNode => write!(f, "Workflow has no Start node"),
            Self::MultipleStartNodes => write!(f, "Workflow has multiple Start nodes"),
            Self::MissingEndNode => write!(f, "Workflow has no End node"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a whole workflow
///
/// Returns all validation errors found (not just the first).
pub fn validate_workflow(
    workflow: &Workflow,
    registry: &ComponentRegistry,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_node_types(workflow, registry, &mut errors);
    validate_connections(workflow, registry, &mut errors);
    validate_start_end_presence(workflow, &mut errors);
    if has_cycle(workflow) {
        errors.push(ValidationError::CycleDetected);
    }

    errors
}

fn validate_node_types(
    workflow: &Workflow,
    registry: &ComponentRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for node in &workflow.nodes {
        if !registry.has_component(node.component_type()) {
            errors.push(ValidationError::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: node.component_type(),
            });
        }
    }
}

fn validate_connections(
    workflow: &Workflow,
    registry: &ComponentRegistry,
    errors: &mut Vec<ValidationError>,
) {
    for connection in &workflow.connections {
        let source = workflow.find_node(&connection.source);
        let target = workflow.find_node(&connection.target);

        if source.is_none() {
            errors.push(ValidationError::UnknownNode {
                connection_id: connection.id.clone(),
                node_id: connection.source.clone(),
            });
        }
        if target.is_none() {
            errors.push(ValidationError::UnknownNode {
                connection_id: connection.id.clone(),
                node_id: connection.target.clone(),
            });
        }

        if let (Some(source), Some(target)) = (source, target) {
            let (source_type, target_type) = (source.component_type(), target.component_type());
            if !can_connect(registry, source_type, target_type) {
                errors.push(ValidationError::IncompatibleConnection {
                    connection_id: connection.id.clone(),
                    source_type,
                    target_type,
                });
            }
        }
    }
}

fn validate_start_end_presence(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    let count = |t: ComponentType| {
        workflow
            .nodes
            .iter()
            .filter(|n| n.component_type() == t)
            .count()
    };

    match count(ComponentType::Start) {
        0 => errors.push(ValidationError::MissingStartNode),
        1 => {}
        _ => errors.push(ValidationError::MultipleStartNodes),
    }
    if count(ComponentType::End) == 0 {
        errors.push(ValidationError::MissingEndNode);
    }
}

/// Detect cycles using Kahn's algorithm
fn has_cycle(workflow: &Workflow) -> bool {
    let node_ids: HashSet<&str> = workflow.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut in_degree: HashMap<&str, usize> = node_ids.iter().map(|id| (*id, 0)).collect();
    for connection in &workflow.connections {
        if node_ids.contains(connection.source.as_str()) {
            if let Some(deg) = in_degree.get_mut(connection.target.as_str()) {
                *deg += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(node_id) = queue.pop_front() {
        visited += 1;
        for connection in workflow.outgoing_connections(node_id) {
            if let Some(deg) = in_degree.get_mut(connection.target.as_str()) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(connection.target.as_str());
                }
            }
        }
    }

    visited < node_ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::graph::Connection;

    fn registry() -> ComponentRegistry {
        ComponentRegistry::with_builtins()
    }

    #[test]
    fn test_can_connect_matches_target_inputs() {
        let registry = registry();
        for source in ComponentType::ALL {
            for target in ComponentType::ALL {
                let expected = registry
                    .get_schema(target)
                    .unwrap()
                    .input_connectables
                    .contains(&source);
                assert_eq!(can_connect(&registry, source, target), expected);
            }
        }
    }

    #[test]
    fn test_target_inputs_are_authoritative() {
        let registry = registry();
        let wallet = registry.get_schema(ComponentType::WalletListener).unwrap();
        assert!(wallet.output_connectables.contains(&ComponentType::TradeExecutor));
        assert!(!can_connect(
            &registry,
            ComponentType::WalletListener,
            ComponentType::TradeExecutor
        ));
        assert!(!suggested_targets(&registry, ComponentType::WalletListener)
            .contains(&ComponentType::TradeExecutor));
    }

    #[test]
    fn test_unknown_target_cannot_connect() {
        let registry = ComponentRegistry::new();
        assert!(!can_connect(&registry, ComponentType::Start, ComponentType::PriceListener));
    }

    #[test]
    fn test_self_loop_rejected() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Test")
            .add_node("e", ComponentType::AiEvaluator, (0.0, 0.0))
            .build();
        assert_eq!(
            check_connection(&wf, &registry, "e", "e"),
            Err(ConnectionRejection::SelfLoop("e".to_string()))
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Test")
            .add_node("l", ComponentType::PriceListener, (0.0, 0.0))
            .add_node("e", ComponentType::AiEvaluator, (200.0, 0.0))
            .connect("l", "e")
            .build();
        assert!(matches!(
            check_connection(&wf, &registry, "l", "e"),
            Err(ConnectionRejection::Duplicate { .. })
        ));
    }

    #[test]
    fn test_single_input_occupied() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Test")
            .add_node("s1", ComponentType::Start, (0.0, 0.0))
            .add_node("s2", ComponentType::Start, (0.0, 100.0))
            .add_node("l", ComponentType::PriceListener, (200.0, 0.0))
            .connect("s1", "l")
            .build();
        assert_eq!(
            check_connection(&wf, &registry, "s2", "l"),
            Err(ConnectionRejection::InputOccupied("l".to_string()))
        );
    }

    #[test]
    fn test_single_output_occupied() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Test")
            .add_node("c", ComponentType::ResultCollector, (0.0, 0.0))
            .add_node("e1", ComponentType::End, (200.0, 0.0))
            .add_node("e2", ComponentType::End, (200.0, 100.0))
            .connect("c", "e1")
            .build();
        assert_eq!(
            check_connection(&wf, &registry, "c", "e2"),
            Err(ConnectionRejection::OutputOccupied("c".to_string()))
        );
    }

    #[test]
    fn test_incompatible_rejected() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Test")
            .add_node("s", ComponentType::Start, (0.0, 0.0))
            .add_node("x", ComponentType::TradeExecutor, (200.0, 0.0))
            .build();
        assert_eq!(
            check_connection(&wf, &registry, "s", "x"),
            Err(ConnectionRejection::Incompatible {
                source_type: ComponentType::Start,
                target_type: ComponentType::TradeExecutor,
            })
        );
    }

    #[test]
    fn test_valid_workflow() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Valid")
            .add_node("s", ComponentType::Start, (0.0, 0.0))
            .add_node("l", ComponentType::PriceListener, (200.0, 0.0))
            .add_node("e", ComponentType::End, (400.0, 0.0))
            .connect("s", "l")
            .connect("l", "e")
            .build();
        let errors = validate_workflow(&wf, &registry);
        assert!(errors.is_empty(), "Expected no errors, got: {:?}", errors);
    }

    #[test]
    fn test_detect_cycle() {
        let registry = registry();
        let mut wf = WorkflowBuilder::new("wf", "Cyclic")
            .add_node("s", ComponentType::Start, (0.0, 0.0))
            .add_node("a", ComponentType::AiEvaluator, (200.0, 0.0))
            .add_node("x", ComponentType::TradeExecutor, (400.0, 0.0))
            .add_node("e", ComponentType::End, (600.0, 0.0))
            .connect("a", "x")
            .build();
        wf.connections.push(Connection::new("back", "x", "a"));

        let errors = validate_workflow(&wf, &registry);
        assert!(errors.contains(&ValidationError::CycleDetected));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::IncompatibleConnection { .. })));
    }

    #[test]
    fn test_missing_start_and_end() {
        let registry = registry();
        let wf = WorkflowBuilder::new("wf", "Empty").build();
        let errors = validate_workflow(&wf, &registry);
        assert!(errors.contains(&ValidationError::MissingStartNode));
        assert!(errors.contains(&ValidationError::MissingEndNode));
    }

    #[test]
    fn test_multiple_starts_and_dangling_connection() {
        let registry = registry();
        let mut wf = WorkflowBuilder::new("wf", "Test")
            .add_node("s1", ComponentType::Start, (0.0, 0.0))
            .add_node("s2", ComponentType::Start, (0.0, 100.0))
            .add_node("e", ComponentType::End, (200.0, 0.0))
            .build();
        wf.connections.push(Connection::new("c1", "ghost", "e"));

        let errors = validate_workflow(&wf, &registry);
        assert!(errors.contains(&ValidationError::MultipleStartNodes));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::UnknownNode { node_id, .. } if node_id == "ghost"
        )));
    }
}
