//! Execution ordering
//!
//! Kahn's algorithm over the connection set. Among nodes that are ready at
//! the same time, lower category rank goes first, then the node that comes
//! first in the workflow.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{FlowEngineError, Result};
use crate::graph::Workflow;
use crate::types::NodeId;

/// How nodes are ordered before a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Dependencies first, category rank as tie-break
    #[default]
    Topological,
    /// Category rank only, connections ignored
    CategoryLayered,
}

/// Order the workflow's nodes for execution.
///
/// Fails with `CycleDetected` under either policy when the connections
/// contain a cycle. Connections to unknown nodes are ignored.
pub fn execution_order(workflow: &Workflow, policy: OrderingPolicy) -> Result<Vec<NodeId>> {
    let topological = topological_order(workflow)?;

    match policy {
        OrderingPolicy::Topological => Ok(topological),
        OrderingPolicy::CategoryLayered => {
            let mut indexed: Vec<(u8, usize, &NodeId)> = workflow
                .nodes
                .iter()
                .enumerate()
                .map(|(i, n)| (n.component_type().category_rank(), i, &n.id))
                .collect();
            indexed.sort();
            Ok(indexed.into_iter().map(|(_, _, id)| id.clone()).collect())
        }
    }
}

fn topological_order(workflow: &Workflow) -> Result<Vec<NodeId>> {
    let index: HashMap<&str, usize> = workflow
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; workflow.nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); workflow.nodes.len()];
    for connection in &workflow.connections {
        if let (Some(&s), Some(&t)) = (
            index.get(connection.source.as_str()),
            index.get(connection.target.as_str()),
        ) {
            successors[s].push(t);
            in_degree[t] += 1;
        }
    }

    let key = |i: usize| Reverse((workflow.nodes[i].component_type().category_rank(), i));
    let mut ready: BinaryHeap<Reverse<(u8, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| key(i))
        .collect();

    let mut order = Vec::with_capacity(workflow.nodes.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        order.push(workflow.nodes[i].id.clone());
        for &next in &successors[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(key(next));
            }
        }
    }

    if order.len() < workflow.nodes.len() {
        log::warn!("Workflow '{}' contains a cycle", workflow.id);
        return Err(FlowEngineError::CycleDetected);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::graph::Connection;
    use crate::types::ComponentType;

    fn position(order: &[NodeId], id: &str) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn test_dependencies_before_dependents() {
        // Inserted in reverse so insertion order alone would be wrong
        let wf = WorkflowBuilder::new("wf", "Pipeline")
            .add_node("end", ComponentType::End, (0.0, 0.0))
            .add_node("collect", ComponentType::ResultCollector, (0.0, 0.0))
            .add_node("exec", ComponentType::TradeExecutor, (0.0, 0.0))
            .add_node("eval", ComponentType::AiEvaluator, (0.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (0.0, 0.0))
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .connect("start", "price")
            .connect("price", "eval")
            .connect("eval", "exec")
            .connect("exec", "collect")
            .connect("collect", "end")
            .build();

        let order = execution_order(&wf, OrderingPolicy::Topological).unwrap();
        assert_eq!(order, vec!["start", "price", "eval", "exec", "collect", "end"]);
        for c in &wf.connections {
            assert!(position(&order, &c.source) < position(&order, &c.target));
        }
    }

    #[test]
    fn test_category_breaks_ties() {
        // price -> end directly, wallet -> eval; end must still wait for eval's branch
        let wf = WorkflowBuilder::new("wf", "Branches")
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (0.0, 0.0))
            .add_node("wallet", ComponentType::WalletListener, (0.0, 0.0))
            .add_node("end", ComponentType::End, (0.0, 0.0))
            .add_node("eval", ComponentType::AiEvaluator, (0.0, 0.0))
            .connect("start", "price")
            .connect("start", "wallet")
            .connect("price", "end")
            .connect("wallet", "eval")
            .connect("eval", "end")
            .build();

        let order = execution_order(&wf, OrderingPolicy::Topological).unwrap();
        assert_eq!(order, vec!["start", "price", "wallet", "eval", "end"]);
    }

    #[test]
    fn test_unconnected_nodes_follow_category() {
        let wf = WorkflowBuilder::new("wf", "Loose")
            .add_node("end", ComponentType::End, (0.0, 0.0))
            .add_node("exec", ComponentType::TradeExecutor, (0.0, 0.0))
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .build();
        let order = execution_order(&wf, OrderingPolicy::Topological).unwrap();
        assert_eq!(order, vec!["start", "exec", "end"]);
    }

    #[test]
    fn test_category_layered_ignores_edges() {
        let wf = WorkflowBuilder::new("wf", "Layered")
            .add_node("exec", ComponentType::TradeExecutor, (0.0, 0.0))
            .add_node("price", ComponentType::PriceListener, (0.0, 0.0))
            .add_node("start", ComponentType::Start, (0.0, 0.0))
            .connect("start", "price")
            .connect("price", "exec")
            .build();
        let order = execution_order(&wf, OrderingPolicy::CategoryLayered).unwrap();
        assert_eq!(order, vec!["start", "price", "exec"]);
    }

    #[test]
    fn test_cycle_is_rejected_under_both_policies() {
        let mut wf = WorkflowBuilder::new("wf", "Cycle")
            .add_node("a", ComponentType::AiEvaluator, (0.0, 0.0))
            .add_node("b", ComponentType::TradeExecutor, (0.0, 0.0))
            .connect("a", "b")
            .build();
        wf.connections.push(Connection::new("back", "b", "a"));

        for policy in [OrderingPolicy::Topological, OrderingPolicy::CategoryLayered] {
            assert!(matches!(
                execution_order(&wf, policy),
                Err(FlowEngineError::CycleDetected)
            ));
        }
    }
}
