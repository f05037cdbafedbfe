use std::collections::HashMap;

use indexmap::IndexMap;

use evalforge_config::{BoxKind, PipelineBox, Variable};

use crate::{MergeTree, NodeId, PortRef};

/// A box of the whole exercise, possibly shared between many tests.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedNode {
    /// The box with its resolved ports.
    pub pipeline_box: PipelineBox,
    /// The pipeline the box comes from.
    pub pipeline: String,
    /// The tests using this box, in test order.
    pub tests: Vec<String>,
    /// For every connected input port, the output port of the optimized node producing it.
    pub parents: IndexMap<String, PortRef>,
    /// The working directory of the box, relative to the evaluation directory.
    pub directory: String,
    /// The test owning the box, `None` for the boxes shared between tests.
    pub test_id: Option<String>,
}

impl OptimizedNode {
    /// The nodes this node depends on, without duplicates, in port order.
    pub fn parent_nodes(&self) -> Vec<NodeId> {
        let mut parents: Vec<NodeId> = vec![];
        for parent in self.parents.values() {
            if !parents.contains(&parent.node) {
                parents.push(parent.node);
            }
        }
        parents
    }
}

/// What makes two boxes of different tests the same box.
#[derive(Debug, PartialEq, Eq, Hash)]
struct NodeKey {
    kind: BoxKind,
    inputs: Vec<(String, Option<Variable>)>,
    outputs: Vec<(String, Option<Variable>)>,
    parents: Vec<(String, PortRef)>,
}

/// Merges the boxes doing the same work in different tests.
///
/// Two boxes are the same if they have the same kind, all their ports hold the same values and
/// their inputs come from the same (already merged) boxes. The boxes working in the directory of
/// a test (executions and judges) are never merged.
pub struct BoxesOptimizer;

impl BoxesOptimizer {
    /// Merge the sorted trees of all the tests of an environment into a single list of boxes, in
    /// an order that respects the dependencies.
    pub fn optimize(trees: &[(MergeTree, Vec<NodeId>)]) -> Vec<OptimizedNode> {
        let mut result: Vec<OptimizedNode> = vec![];
        let mut known: HashMap<NodeKey, usize> = HashMap::new();
        for (tree, order) in trees {
            let mut mapping: HashMap<NodeId, usize> = HashMap::new();
            for &node in order {
                let data = &tree.nodes[node];
                let parents: IndexMap<String, PortRef> = data
                    .parents
                    .iter()
                    .filter_map(|(port, parent)| {
                        mapping.get(&parent.node).map(|&node| {
                            (
                                port.clone(),
                                PortRef {
                                    node,
                                    port: parent.port.clone(),
                                },
                            )
                        })
                    })
                    .collect();
                let b = &data.pipeline_box;
                let key = NodeKey {
                    kind: b.kind,
                    inputs: b
                        .input_ports()
                        .map(|p| (p.name.clone(), p.value().cloned()))
                        .collect(),
                    outputs: b
                        .output_ports()
                        .map(|p| (p.name.clone(), p.value().cloned()))
                        .collect(),
                    parents: parents
                        .iter()
                        .map(|(port, parent)| (port.clone(), parent.clone()))
                        .collect(),
                };
                let existing = if b.kind.is_test_specific() {
                    None
                } else {
                    known.get(&key).copied()
                };
                let index = match existing {
                    Some(index) => {
                        trace!(
                            "Box '{}' of test '{}' merged with the one of test '{}'",
                            b.name,
                            tree.test_id,
                            result[index].tests[0]
                        );
                        if !result[index].tests.contains(&tree.test_id) {
                            result[index].tests.push(tree.test_id.clone());
                        }
                        index
                    }
                    None => {
                        result.push(OptimizedNode {
                            pipeline_box: b.clone(),
                            pipeline: tree.pipeline_of(node).id.clone(),
                            tests: vec![tree.test_id.clone()],
                            parents,
                            directory: String::new(),
                            test_id: None,
                        });
                        if !b.kind.is_test_specific() {
                            known.insert(key, result.len() - 1);
                        }
                        result.len() - 1
                    }
                };
                mapping.insert(node, index);
            }
        }
        debug!(
            "{} boxes left after merging the boxes of {} tests",
            result.len(),
            trees.len()
        );
        result
    }
}
