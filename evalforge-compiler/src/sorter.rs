use std::collections::BTreeSet;

use evalforge_config::{CompilationError, ConfigError};

use crate::{MergeTree, NodeId};

/// Orders the boxes of a test so that every box comes after the boxes producing its inputs.
///
/// Among the boxes ready to be scheduled the one declared first (by pipeline, then by position in
/// the pipeline) is always picked, so the order is fully determined by the configuration.
pub struct BoxesSorter;

impl BoxesSorter {
    /// Sort the nodes of the tree, returning their identifiers in order.
    pub fn sort(tree: &MergeTree) -> Result<Vec<NodeId>, CompilationError> {
        let mut num_dependencies: Vec<usize> = tree
            .nodes
            .iter()
            .map(|node| node.parent_nodes().len())
            .collect();
        let mut dependents: Vec<Vec<NodeId>> = vec![vec![]; tree.nodes.len()];
        for (node, data) in tree.nodes.iter().enumerate() {
            for parent in data.parent_nodes() {
                dependents[parent].push(node);
            }
        }
        let mut ready: BTreeSet<NodeId> = num_dependencies
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| node)
            .collect();

        let mut order = Vec::with_capacity(tree.nodes.len());
        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in &dependents[node] {
                num_dependencies[dependent] -= 1;
                if num_dependencies[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        // the nodes never scheduled are in a cycle, or depend on one
        if let Some(start) = num_dependencies.iter().position(|count| *count > 0) {
            let node = node_in_cycle(tree, &num_dependencies, start);
            let error = ConfigError::Cycle(tree.nodes[node].pipeline_box.name.clone());
            return Err(tree.locate(Some(node), error.into()));
        }
        Ok(order)
    }
}

/// Walk back the unscheduled parents from a node until one is visited twice.
fn node_in_cycle(tree: &MergeTree, num_dependencies: &[usize], start: NodeId) -> NodeId {
    let mut visited = BTreeSet::new();
    let mut node = start;
    while visited.insert(node) {
        match tree.nodes[node]
            .parent_nodes()
            .into_iter()
            .find(|p| num_dependencies[*p] > 0)
        {
            Some(parent) => node = parent,
            None => break,
        }
    }
    node
}
