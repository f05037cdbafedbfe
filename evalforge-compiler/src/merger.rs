use std::collections::HashMap;

use indexmap::IndexMap;

use evalforge_config::{
    BoxKind, CompilationError, ConfigError, ExerciseConfig, PipelineBox, PipelineProvider,
    VariablesTable,
};

/// The index of a node inside its [`MergeTree`](struct.MergeTree.html).
pub type NodeId = usize;

/// A port of a specific node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub port: String,
}

/// The instance of a pipeline inside a test, with the tables its variables are resolved with.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInstance {
    /// The identifier of the pipeline.
    pub id: String,
    /// The variables of the pipeline.
    pub variables: VariablesTable,
    /// Hashes of the remote files of the pipeline.
    pub files: IndexMap<String, String>,
    /// The exercise variables bound for this pipeline by the test.
    pub exercise_variables: VariablesTable,
}

/// A box of a test, connected to the boxes producing its inputs and consuming its outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PortNode {
    /// The index of the pipeline instance the box comes from.
    pub pipeline: usize,
    /// The box, whose ports receive the resolved values.
    pub pipeline_box: PipelineBox,
    /// For every connected input port, the output port producing its value.
    pub parents: IndexMap<String, PortRef>,
    /// For every connected output port, the input ports consuming its value.
    pub children: IndexMap<String, Vec<PortRef>>,
}

impl PortNode {
    pub(crate) fn new(pipeline: usize, pipeline_box: PipelineBox) -> PortNode {
        PortNode {
            pipeline,
            pipeline_box,
            parents: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

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

    /// Whether this node is a `data-in` box not fed by another pipeline.
    pub fn is_input(&self) -> bool {
        self.pipeline_box.kind == BoxKind::DataIn
    }
}

/// All the boxes of a test in a runtime environment, merged in a single graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeTree {
    /// The test the tree evaluates.
    pub test_id: String,
    /// The runtime environment the tree is built for.
    pub environment: String,
    /// The pipelines of the test, in order.
    pub pipelines: Vec<PipelineInstance>,
    /// The boxes, in declaration order (pipeline order, then box order).
    pub nodes: Vec<PortNode>,
}

impl MergeTree {
    /// The pipeline instance a node comes from.
    pub fn pipeline_of(&self, node: NodeId) -> &PipelineInstance {
        &self.pipelines[self.nodes[node].pipeline]
    }

    /// Wrap an error with the test, the environment and the pipeline of a node.
    pub fn locate(&self, node: Option<NodeId>, error: CompilationError) -> CompilationError {
        self.locate_pipeline(node.map(|n| self.nodes[n].pipeline), error)
    }

    /// Wrap an error with the test, the environment and the specified pipeline.
    pub fn locate_pipeline(
        &self,
        pipeline: Option<usize>,
        error: CompilationError,
    ) -> CompilationError {
        let pipeline = pipeline.map(|p| self.pipelines[p].id.clone());
        error.located(self.test_id.as_str(), self.environment.as_str(), pipeline)
    }

    pub(crate) fn connect(&mut self, from: PortRef, to: PortRef) {
        self.nodes[from.node]
            .children
            .entry(from.port.clone())
            .or_default()
            .push(to.clone());
        self.nodes[to.node].parents.insert(to.port, from);
    }
}

/// Instantiates the pipelines of every test and links them together.
///
/// Inside a pipeline an input port is connected to the output port producing the same variable.
/// Between two adjacent pipelines a `data-out` box of the first one and a `data-in` box of the
/// second one with the same variable are removed, and the box producing the value is connected
/// directly to the boxes consuming it.
pub struct PipelinesMerger<'a, P: PipelineProvider + ?Sized> {
    pipelines: &'a P,
}

impl<'a, P: PipelineProvider + ?Sized> PipelinesMerger<'a, P> {
    pub fn new(pipelines: &'a P) -> Self {
        PipelinesMerger { pipelines }
    }

    /// Build the tree of every test of the exercise for the environment, in test order.
    pub fn merge(
        &self,
        config: &ExerciseConfig,
        environment: &str,
    ) -> Result<Vec<MergeTree>, CompilationError> {
        config
            .test_ids()
            .map(|test| self.merge_test(config, test, environment))
            .collect()
    }

    /// Build the tree of a single test.
    pub fn merge_test(
        &self,
        config: &ExerciseConfig,
        test: &str,
        environment: &str,
    ) -> Result<MergeTree, CompilationError> {
        let mut tree = MergeTree {
            test_id: test.to_string(),
            environment: environment.to_string(),
            pipelines: vec![],
            nodes: vec![],
        };
        let pipelines = config.pipelines(test, environment).ok_or_else(|| {
            CompilationError::from(ConfigError::UnknownEnvironment(environment.to_string()))
                .located(test, environment, None)
        })?;

        let mut removed = vec![];
        // variable -> (pipeline index, data-out node) of every pipeline merged so far
        let mut exports: HashMap<String, Vec<(usize, NodeId)>> = HashMap::new();
        for (index, vars) in pipelines.iter().enumerate() {
            let pipeline = self.pipelines.pipeline(&vars.name).ok_or_else(|| {
                CompilationError::from(ConfigError::MissingPipeline(vars.name.clone())).located(
                    test,
                    environment,
                    None,
                )
            })?;
            tree.pipelines.push(PipelineInstance {
                id: pipeline.id.clone(),
                variables: pipeline.variables.clone(),
                files: pipeline.files.clone(),
                exercise_variables: vars.variables.clone(),
            });
            let first = tree.nodes.len();
            for b in &pipeline.boxes {
                tree.nodes.push(PortNode::new(index, b.clone()));
            }
            let nodes: Vec<NodeId> = (first..tree.nodes.len()).collect();
            connect_pipeline(&mut tree, &nodes)
                .map_err(|e| tree.locate_pipeline(Some(index), e.into()))?;
            let collapsed = link_previous(&mut tree, &nodes, index, &exports)
                .map_err(|e| tree.locate_pipeline(Some(index), e.into()))?;
            removed.extend(collapsed);
            for &node in &nodes {
                let b = &tree.nodes[node].pipeline_box;
                if b.kind == BoxKind::DataOut {
                    if let Some(var) = b.data_port().and_then(|p| p.variable()) {
                        exports
                            .entry(var.to_string())
                            .or_default()
                            .push((index, node));
                    }
                }
            }
        }
        let tree = compact(tree, &removed);
        debug!(
            "Merged {} pipelines of test '{}' into {} boxes",
            tree.pipelines.len(),
            tree.test_id,
            tree.nodes.len()
        );
        Ok(tree)
    }
}

/// Connect the boxes of a single pipeline through their variables.
fn connect_pipeline(tree: &mut MergeTree, nodes: &[NodeId]) -> Result<(), ConfigError> {
    let mut producers: HashMap<String, PortRef> = HashMap::new();
    for &node in nodes {
        for port in tree.nodes[node].pipeline_box.output_ports() {
            let Some(var) = port.variable() else {
                continue;
            };
            let producer = PortRef {
                node,
                port: port.name.clone(),
            };
            if let Some(other) = producers.insert(var.to_string(), producer) {
                return Err(ConfigError::AmbiguousBinding {
                    variable: var.to_string(),
                    reason: format!(
                        "produced by both box '{}' and box '{}'",
                        tree.nodes[other.node].pipeline_box.name, tree.nodes[node].pipeline_box.name
                    ),
                });
            }
        }
    }
    for &node in nodes {
        let consumers: Vec<(String, String)> = tree.nodes[node]
            .pipeline_box
            .input_ports()
            .filter_map(|p| p.variable().map(|v| (p.name.clone(), v.to_string())))
            .collect();
        for (port, var) in consumers {
            if let Some(producer) = producers.get(&var) {
                if producer.node == node {
                    return Err(ConfigError::Cycle(
                        tree.nodes[node].pipeline_box.name.clone(),
                    ));
                }
                tree.connect(producer.clone(), PortRef { node, port });
            }
        }
    }
    Ok(())
}

/// Collapse the `data-in` boxes of a pipeline with the `data-out` boxes of the previous one,
/// returning the removed nodes.
fn link_previous(
    tree: &mut MergeTree,
    nodes: &[NodeId],
    index: usize,
    exports: &HashMap<String, Vec<(usize, NodeId)>>,
) -> Result<Vec<NodeId>, ConfigError> {
    let mut removed = vec![];
    for &node in nodes {
        let b = &tree.nodes[node].pipeline_box;
        if b.kind != BoxKind::DataIn {
            continue;
        }
        let Some(port) = b.data_port() else {
            continue;
        };
        let Some(var) = port.variable() else {
            continue;
        };
        let Some(exporters) = exports.get(var) else {
            continue;
        };
        let Some(&(_, data_out)) = exporters.iter().find(|(i, _)| i + 1 == index) else {
            let (other, _) = exporters[0];
            return Err(ConfigError::AmbiguousBinding {
                variable: var.to_string(),
                reason: format!(
                    "exported by pipeline '{}' which is not the previous one",
                    tree.pipelines[other].id
                ),
            });
        };
        let (var, in_type, in_port) = (var.to_string(), port.port_type, port.name.clone());
        let out_port = tree.nodes[data_out]
            .pipeline_box
            .data_port()
            .map(|p| (p.name.clone(), p.port_type));
        let Some((out_port, out_type)) = out_port else {
            continue;
        };
        if in_type != out_type {
            return Err(ConfigError::TypeMismatch {
                what: format!("variable '{}' passed between pipelines", var),
                expected: out_type,
                found: in_type,
            });
        }
        let producer = tree.nodes[data_out]
            .parents
            .get(&out_port)
            .cloned()
            .ok_or_else(|| {
                ConfigError::MalformedGraph(format!(
                    "variable '{}' is exported but no box produces it",
                    var
                ))
            })?;
        trace!(
            "Collapsing variable '{}' between boxes '{}' and '{}'",
            var,
            tree.nodes[data_out].pipeline_box.name,
            tree.nodes[node].pipeline_box.name
        );
        // detach the data-out box from its producer
        if let Some(children) = tree.nodes[producer.node].children.get_mut(&producer.port) {
            children.retain(|c| c.node != data_out);
        }
        tree.nodes[data_out].parents.clear();
        // move the consumers of the data-in box to the producer
        let consumers = tree.nodes[node]
            .children
            .shift_remove(&in_port)
            .unwrap_or_default();
        for consumer in consumers {
            tree.connect(producer.clone(), consumer);
        }
        if !removed.contains(&data_out) {
            removed.push(data_out);
        }
        removed.push(node);
    }
    Ok(removed)
}

/// Drop the removed nodes, renumbering the others.
fn compact(tree: MergeTree, removed: &[NodeId]) -> MergeTree {
    let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
    for node in 0..tree.nodes.len() {
        if !removed.contains(&node) {
            let next = mapping.len();
            mapping.insert(node, next);
        }
    }
    let remap = |r: &PortRef| {
        mapping.get(&r.node).map(|&node| PortRef {
            node,
            port: r.port.clone(),
        })
    };
    let nodes = tree
        .nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| mapping.contains_key(i))
        .map(|(_, node)| PortNode {
            pipeline: node.pipeline,
            pipeline_box: node.pipeline_box.clone(),
            parents: node
                .parents
                .iter()
                .filter_map(|(port, parent)| remap(parent).map(|p| (port.clone(), p)))
                .collect(),
            children: node
                .children
                .iter()
                .map(|(port, children)| {
                    let children: Vec<PortRef> = children.iter().filter_map(remap).collect();
                    (port.clone(), children)
                })
                .filter(|(_, children)| !children.is_empty())
                .collect(),
        })
        .collect();
    MergeTree {
        test_id: tree.test_id,
        environment: tree.environment,
        pipelines: tree.pipelines,
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use evalforge_config::{
        ports, Pipeline, PipelineVars, TestConfig, TestEnvironment, VariableType,
    };

    use super::*;

    fn compilation() -> Pipeline {
        let mut pipeline = Pipeline::new("compilation");
        let mut gcc = PipelineBox::new("compile", BoxKind::GccCompilation);
        gcc.bind_input(ports::SOURCE_FILES, "sources")
            .unwrap()
            .bind_output(ports::BINARY_FILE, "binary")
            .unwrap();
        pipeline
            .add_box(PipelineBox::data_in("src", VariableType::FileArray, "sources"))
            .unwrap()
            .add_box(gcc)
            .unwrap()
            .add_box(PipelineBox::data_out("bin", VariableType::File, "binary"))
            .unwrap();
        pipeline
    }

    fn execution() -> Pipeline {
        let mut pipeline = Pipeline::new("execution");
        let mut exec = PipelineBox::new("run", BoxKind::ElfExecution);
        exec.bind_input(ports::BINARY_FILE, "binary")
            .unwrap()
            .bind_output(ports::STDOUT, "out")
            .unwrap();
        pipeline
            .add_box(PipelineBox::data_in("bin", VariableType::File, "binary"))
            .unwrap()
            .add_box(exec)
            .unwrap();
        pipeline
    }

    fn config(pipelines: &[&str]) -> ExerciseConfig {
        let mut config = ExerciseConfig::default();
        config.environments.push("c".into());
        let mut test = TestConfig::default();
        test.environments.insert(
            "c".into(),
            TestEnvironment {
                pipelines: pipelines
                    .iter()
                    .map(|p| PipelineVars {
                        name: p.to_string(),
                        variables: VariablesTable::new(),
                    })
                    .collect(),
            },
        );
        config.tests.insert("01".into(), test);
        config
    }

    #[test]
    fn test_merge_adjacent_pipelines() {
        let pipelines = vec![compilation(), execution()];
        let merger = PipelinesMerger::new(&pipelines);
        let tree = merger
            .merge_test(&config(&["compilation", "execution"]), "01", "c")
            .unwrap();
        let names: Vec<_> = tree
            .nodes
            .iter()
            .map(|n| n.pipeline_box.name.as_str())
            .collect();
        assert_eq!(names, vec!["src", "compile", "run"]);
        assert_eq!(
            tree.nodes[2].parents[ports::BINARY_FILE],
            PortRef {
                node: 1,
                port: ports::BINARY_FILE.into()
            }
        );
        assert_eq!(tree.nodes[1].children[ports::BINARY_FILE].len(), 1);
        assert_eq!(tree.nodes[1].parents[ports::SOURCE_FILES].node, 0);
        assert!(tree.nodes[0].is_input());
    }

    #[test]
    fn test_missing_pipeline() {
        let pipelines = vec![compilation()];
        let merger = PipelinesMerger::new(&pipelines);
        let err = merger
            .merge_test(&config(&["compilation", "nope"]), "01", "c")
            .unwrap_err();
        match err {
            CompilationError::Config(e) => {
                assert_eq!(e.root(), &ConfigError::MissingPipeline("nope".into()))
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn test_unknown_environment() {
        let pipelines = vec![compilation()];
        let merger = PipelinesMerger::new(&pipelines);
        let err = merger
            .merge_test(&config(&["compilation"]), "01", "java")
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_two_producers_are_ambiguous() {
        let mut pipeline = compilation();
        let mut other = PipelineBox::new("compile2", BoxKind::GppCompilation);
        other.bind_output(ports::BINARY_FILE, "binary").unwrap();
        pipeline.add_box(other).unwrap();
        let pipelines = vec![pipeline];
        let merger = PipelinesMerger::new(&pipelines);
        let err = merger
            .merge_test(&config(&["compilation"]), "01", "c")
            .unwrap_err();
        match err {
            CompilationError::Config(e) => {
                assert!(matches!(e.root(), ConfigError::AmbiguousBinding { .. }))
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn test_non_adjacent_export_is_ambiguous() {
        let mut middle = Pipeline::new("middle");
        middle
            .add_box(PipelineBox::data_in("x", VariableType::String, "unrelated"))
            .unwrap();
        let pipelines = vec![compilation(), middle, execution()];
        let merger = PipelinesMerger::new(&pipelines);
        let err = merger
            .merge_test(&config(&["compilation", "middle", "execution"]), "01", "c")
            .unwrap_err();
        match err {
            CompilationError::Config(e) => {
                assert!(matches!(e.root(), ConfigError::AmbiguousBinding { .. }))
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn test_type_mismatch_between_pipelines() {
        let mut exec = execution();
        exec.boxes[0] = PipelineBox::data_in("bin", VariableType::FileArray, "binary");
        let pipelines = vec![compilation(), exec];
        let merger = PipelinesMerger::new(&pipelines);
        let err = merger
            .merge_test(&config(&["compilation", "execution"]), "01", "c")
            .unwrap_err();
        match err {
            CompilationError::Config(e) => {
                assert!(matches!(e.root(), ConfigError::TypeMismatch { .. }))
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }
}
