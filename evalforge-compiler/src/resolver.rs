use indexmap::IndexMap;
use wildmatch::WildMatch;

use evalforge_config::{
    CompilationError, ConfigError, InvariantViolation, Variable, VariableValue, VariablesTable,
};

use crate::{MergeTree, NodeId, PortRef};

/// Where the value of a variable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// The variable is a constant of the pipeline.
    Pipeline,
    /// The variable references the runtime environment.
    Environment,
    /// The variable references the exercise.
    Exercise,
}

/// Assigns a concrete value to every connected port of a [`MergeTree`](struct.MergeTree.html).
///
/// The resolution happens in two passes. First the input nodes (the `data-in` boxes not fed by
/// another pipeline) receive their values: the references are followed into the environment and
/// the exercise tables, the patterns are matched against the submitted files and the remote files
/// are replaced by their hashes. Then every other port is resolved, copying the value of its
/// producer or looking the variable up in the table of the pipeline producing it.
///
/// Resolving an already resolved tree does not change it.
pub struct VariablesResolver<'a> {
    environment_variables: &'a VariablesTable,
    exercise_files: &'a IndexMap<String, String>,
    submitted_files: &'a [String],
}

impl<'a> VariablesResolver<'a> {
    pub fn new(
        environment_variables: &'a VariablesTable,
        exercise_files: &'a IndexMap<String, String>,
        submitted_files: &'a [String],
    ) -> Self {
        VariablesResolver {
            environment_variables,
            exercise_files,
            submitted_files,
        }
    }

    /// Resolve all the ports of the tree.
    pub fn resolve(&self, tree: &mut MergeTree) -> Result<(), CompilationError> {
        self.resolve_input_nodes(tree)?;
        self.resolve_other_nodes(tree)?;
        debug!("Resolved the variables of test '{}'", tree.test_id);
        Ok(())
    }

    fn resolve_input_nodes(&self, tree: &mut MergeTree) -> Result<(), CompilationError> {
        for node in 0..tree.nodes.len() {
            if !tree.nodes[node].is_input() {
                continue;
            }
            let Some(port) = tree.nodes[node].pipeline_box.data_port() else {
                continue;
            };
            let Some(var) = port.variable() else {
                continue;
            };
            let (port, var) = (port.name.clone(), var.to_string());
            let value = self
                .variable(tree, node, &var, true)
                .map_err(|e| tree.locate(Some(node), e.into()))?;
            self.propagate(tree, PortRef { node, port }, value)?;
        }
        Ok(())
    }

    fn resolve_other_nodes(&self, tree: &mut MergeTree) -> Result<(), CompilationError> {
        for node in 0..tree.nodes.len() {
            if tree.nodes[node].is_input() {
                continue;
            }
            let inputs: Vec<(String, String, bool)> = tree.nodes[node]
                .pipeline_box
                .input_ports()
                .filter_map(|p| {
                    p.variable()
                        .map(|v| (p.name.clone(), v.to_string(), p.is_resolved()))
                })
                .collect();
            for (port, var, resolved) in inputs {
                if resolved {
                    continue;
                }
                let target = PortRef {
                    node,
                    port: port.clone(),
                };
                match tree.nodes[node].parents.get(&port).cloned() {
                    Some(parent) => {
                        let (parent_var, parent_value) = match output_port(tree, &parent) {
                            Some(p) => (p.variable().map(String::from), p.value().cloned()),
                            None => {
                                return Err(InvariantViolation(format!(
                                    "output port '{}' of box '{}' not found",
                                    parent.port, tree.nodes[parent.node].pipeline_box.name
                                ))
                                .into())
                            }
                        };
                        if parent_var.as_deref() != Some(var.as_str()) {
                            let error = ConfigError::MalformedGraph(format!(
                                "port '{}' reads variable '{}' but its producer writes '{}'",
                                port,
                                var,
                                parent_var.unwrap_or_default()
                            ));
                            return Err(tree.locate(Some(node), error.into()));
                        }
                        let value = match parent_value {
                            Some(value) => value,
                            None => {
                                let value = self
                                    .variable(tree, parent.node, &var, false)
                                    .map_err(|e| tree.locate(Some(parent.node), e.into()))?;
                                set_port(tree, &parent, true, value.clone())?;
                                value
                            }
                        };
                        set_port(tree, &target, false, value)?;
                    }
                    None => {
                        let value = self
                            .variable(tree, node, &var, false)
                            .map_err(|e| tree.locate(Some(node), e.into()))?;
                        set_port(tree, &target, false, value)?;
                    }
                }
            }

            let outputs: Vec<(String, String, Option<Variable>)> = tree.nodes[node]
                .pipeline_box
                .output_ports()
                .filter_map(|p| {
                    p.variable()
                        .map(|v| (p.name.clone(), v.to_string(), p.value().cloned()))
                })
                .collect();
            for (port, var, value) in outputs {
                let value = match value {
                    Some(value) => value,
                    None => self
                        .variable(tree, node, &var, false)
                        .map_err(|e| tree.locate(Some(node), e.into()))?,
                };
                self.propagate(tree, PortRef { node, port }, value)?;
            }
        }
        Ok(())
    }

    /// Write the value to an output port and to all the input ports connected to it.
    fn propagate(
        &self,
        tree: &mut MergeTree,
        port: PortRef,
        value: Variable,
    ) -> Result<(), CompilationError> {
        set_port(tree, &port, true, value.clone())?;
        let children = tree.nodes[port.node]
            .children
            .get(&port.port)
            .cloned()
            .unwrap_or_default();
        for child in children {
            set_port(tree, &child, false, value.clone())?;
        }
        Ok(())
    }

    /// The value of a variable of the pipeline a node comes from.
    fn variable(
        &self,
        tree: &MergeTree,
        node: NodeId,
        name: &str,
        match_files: bool,
    ) -> Result<Variable, ConfigError> {
        let instance = tree.pipeline_of(node);
        let var = instance
            .variables
            .get(name)
            .ok_or_else(|| ConfigError::UnresolvedVariable(name.to_string()))?;
        let (mut value, source) = match var.reference() {
            None => (var.clone(), Source::Pipeline),
            Some(reference) => {
                let (found, source) =
                    if let Some(found) = self.environment_variables.get(reference) {
                        (found, Source::Environment)
                    } else if let Some(found) = instance.exercise_variables.get(reference) {
                        (found, Source::Exercise)
                    } else {
                        return Err(ConfigError::UnresolvedReference(reference.to_string()));
                    };
                if found.var_type != var.var_type {
                    return Err(ConfigError::TypeMismatch {
                        what: format!("variable '{}' referenced by '{}'", reference, name),
                        expected: var.var_type,
                        found: found.var_type,
                    });
                }
                (found.renamed(name), source)
            }
        };
        trace!("Variable '{}' resolved from {:?}: {:?}", name, source, value.value);

        let is_pattern = source == Source::Environment || value.is_array();
        if match_files && is_pattern && value.is_wildcard() {
            value = self.match_submitted(value)?;
        }
        if value.is_remote_file() {
            let (primary, fallback) = match source {
                Source::Pipeline => (&instance.files, self.exercise_files),
                _ => (self.exercise_files, &instance.files),
            };
            value = hash_remote(value, primary, fallback)?;
        }
        Ok(value)
    }

    /// Replace a pattern with the submitted files matching it, in submission order. A scalar
    /// keeps only the first match.
    fn match_submitted(&self, var: Variable) -> Result<Variable, ConfigError> {
        let VariableValue::Scalar(pattern) = &var.value else {
            return Ok(var);
        };
        if pattern.is_empty() {
            return Ok(var);
        }
        let matcher = WildMatch::new(pattern);
        let mut matches: Vec<String> = self
            .submitted_files
            .iter()
            .filter(|f| matcher.matches(f))
            .cloned()
            .collect();
        if matches.is_empty() {
            return Err(ConfigError::NoFileMatched {
                variable: var.name.clone(),
                pattern: pattern.clone(),
            });
        }
        let value = if var.is_array() {
            VariableValue::Array(matches)
        } else {
            VariableValue::Scalar(matches.swap_remove(0))
        };
        Ok(Variable { value, ..var })
    }
}

/// Replace the names of the remote files with their hashes.
fn hash_remote(
    var: Variable,
    primary: &IndexMap<String, String>,
    fallback: &IndexMap<String, String>,
) -> Result<Variable, ConfigError> {
    let hash = |name: &str| -> Result<String, ConfigError> {
        if name.is_empty() {
            return Ok(String::new());
        }
        primary
            .get(name)
            .or_else(|| fallback.get(name))
            .cloned()
            .ok_or_else(|| ConfigError::MissingFile(name.to_string()))
    };
    let value = match &var.value {
        VariableValue::Scalar(name) => VariableValue::Scalar(hash(name)?),
        VariableValue::Array(names) => VariableValue::Array(
            names
                .iter()
                .map(|name| hash(name))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(Variable { value, ..var })
}

fn output_port<'t>(tree: &'t MergeTree, port: &PortRef) -> Option<&'t evalforge_config::Port> {
    tree.nodes[port.node].pipeline_box.output_port(&port.port)
}

fn set_port(
    tree: &mut MergeTree,
    port: &PortRef,
    output: bool,
    value: Variable,
) -> Result<(), CompilationError> {
    let node = &mut tree.nodes[port.node];
    let box_name = node.pipeline_box.name.clone();
    let target = if output {
        node.pipeline_box.output_port_mut(&port.port)
    } else {
        node.pipeline_box.input_port_mut(&port.port)
    };
    let Some(target) = target else {
        return Err(InvariantViolation(format!(
            "port '{}' of box '{}' not found",
            port.port, box_name
        ))
        .into());
    };
    trace!(
        "Port '{}' of box '{}' = {:?}",
        port.port,
        box_name,
        value.value
    );
    match target.set_value(value) {
        Ok(()) => Ok(()),
        Err(e) => Err(tree.locate(Some(port.node), e)),
    }
}
