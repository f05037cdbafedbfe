//! The boxes a pipeline is made of.
//!
//! Every kind of box has a fixed set of typed input and output ports (except the data boxes, whose
//! single port is configured by the pipeline) and knows how to lower itself into the tasks of the
//! job configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use evalforge_job::dirs::EVAL_DIR;
use evalforge_job::{HwGroupLimits, Task};

use crate::{join_path, CompilationError, ConfigError, InvariantViolation, Port, VariableType};

mod compilation;
mod execution;
mod fetch;
mod judge;

pub use compilation::{GCC_BINARY, GPP_BINARY};
pub use judge::DEFAULT_JUDGE;

/// Names of the ports of the built-in boxes.
pub mod ports {
    pub const REMOTE: &str = "remote";
    pub const INPUT: &str = "input";
    pub const ARGS: &str = "args";
    pub const SOURCE_FILES: &str = "source-files";
    pub const BINARY_FILE: &str = "binary-file";
    pub const STDIN: &str = "stdin";
    pub const INPUT_FILES: &str = "input-files";
    pub const STDOUT: &str = "stdout";
    pub const OUTPUT_FILE: &str = "output-file";
    pub const JUDGE_TYPE: &str = "judge-type";
    pub const EXPECTED_OUTPUT: &str = "expected-output";
    pub const ACTUAL_OUTPUT: &str = "actual-output";
    pub const SCORE: &str = "score";
}

/// The kind of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoxKind {
    /// Entry point of external data in a pipeline.
    DataIn,
    /// Exit point of the data produced by a pipeline.
    DataOut,
    /// Download a single remote file.
    FetchFile,
    /// Download a list of remote files.
    FetchFiles,
    /// Compile C sources with gcc.
    GccCompilation,
    /// Compile C++ sources with g++.
    GppCompilation,
    /// Run an ELF binary in the sandbox.
    ElfExecution,
    /// Judge the output of an execution.
    Judge,
}

impl BoxKind {
    /// All the kinds of box.
    pub const ALL: [BoxKind; 8] = [
        BoxKind::DataIn,
        BoxKind::DataOut,
        BoxKind::FetchFile,
        BoxKind::FetchFiles,
        BoxKind::GccCompilation,
        BoxKind::GppCompilation,
        BoxKind::ElfExecution,
        BoxKind::Judge,
    ];

    /// Parse the type of a box as written in the pipeline configuration.
    pub fn from_type(box_type: &str) -> Result<BoxKind, ConfigError> {
        BoxKind::ALL
            .iter()
            .find(|kind| kind.type_name() == box_type)
            .copied()
            .ok_or_else(|| ConfigError::UnknownBoxType(box_type.to_string()))
    }

    /// The type of the box as written in the pipeline configuration.
    pub fn type_name(&self) -> &'static str {
        match self {
            BoxKind::DataIn => "data-in",
            BoxKind::DataOut => "data-out",
            BoxKind::FetchFile => "fetch-file",
            BoxKind::FetchFiles => "fetch-files",
            BoxKind::GccCompilation => "gcc",
            BoxKind::GppCompilation => "g++",
            BoxKind::ElfExecution => "elf-exec",
            BoxKind::Judge => "judge",
        }
    }

    /// Whether the ports of the box are defined by the pipeline instead of by the kind.
    pub fn has_configurable_ports(&self) -> bool {
        matches!(self, BoxKind::DataIn | BoxKind::DataOut)
    }

    /// Whether the box works in the directory of a test, so it cannot be shared between tests.
    pub fn is_test_specific(&self) -> bool {
        matches!(self, BoxKind::ElfExecution | BoxKind::Judge)
    }

    /// The input ports of a box of this kind, not connected to any variable.
    pub fn default_input_ports(&self) -> Vec<Port> {
        match self {
            BoxKind::DataIn | BoxKind::DataOut => vec![],
            BoxKind::FetchFile => vec![Port::new(ports::REMOTE, VariableType::RemoteFile)],
            BoxKind::FetchFiles => vec![Port::new(ports::REMOTE, VariableType::RemoteFileArray)],
            BoxKind::GccCompilation | BoxKind::GppCompilation => vec![
                Port::new(ports::ARGS, VariableType::StringArray),
                Port::new(ports::SOURCE_FILES, VariableType::FileArray),
            ],
            BoxKind::ElfExecution => vec![
                Port::new(ports::ARGS, VariableType::StringArray),
                Port::new(ports::STDIN, VariableType::File),
                Port::new(ports::INPUT_FILES, VariableType::FileArray),
                Port::new(ports::BINARY_FILE, VariableType::File),
            ],
            BoxKind::Judge => vec![
                Port::new(ports::JUDGE_TYPE, VariableType::String),
                Port::new(ports::ARGS, VariableType::StringArray),
                Port::new(ports::EXPECTED_OUTPUT, VariableType::File),
                Port::new(ports::ACTUAL_OUTPUT, VariableType::File),
            ],
        }
    }

    /// The output ports of a box of this kind, not connected to any variable.
    pub fn default_output_ports(&self) -> Vec<Port> {
        match self {
            BoxKind::DataIn | BoxKind::DataOut => vec![],
            BoxKind::FetchFile => vec![Port::new(ports::INPUT, VariableType::File)],
            BoxKind::FetchFiles => vec![Port::new(ports::INPUT, VariableType::FileArray)],
            BoxKind::GccCompilation | BoxKind::GppCompilation => {
                vec![Port::new(ports::BINARY_FILE, VariableType::File)]
            }
            BoxKind::ElfExecution => vec![
                Port::new(ports::STDOUT, VariableType::File),
                Port::new(ports::OUTPUT_FILE, VariableType::File),
            ],
            BoxKind::Judge => vec![Port::new(ports::SCORE, VariableType::String)],
        }
    }
}

/// The values the lowering of a box depends on, besides the box itself.
#[derive(Debug, Clone, Copy)]
pub struct CompilationParams<'a> {
    /// The test owning the box, `None` for boxes shared between tests.
    pub test_id: Option<&'a str>,
    /// The working directory of the box, relative to the evaluation directory.
    pub directory: &'a str,
    /// The limits of the test for every hardware group.
    pub limits: &'a [HwGroupLimits],
}

/// How a port is written in the pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// The type of the port.
    #[serde(rename = "type")]
    pub port_type: VariableType,
    /// The name of the variable connected to the port, empty for unconnected ports.
    #[serde(default)]
    pub value: String,
}

/// How a box is written in the pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub box_type: String,
    #[serde(default)]
    pub ports_in: IndexMap<String, PortSpec>,
    #[serde(default)]
    pub ports_out: IndexMap<String, PortSpec>,
}

/// A box of a pipeline, with its ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineBox {
    /// The name of the box, unique inside its pipeline.
    pub name: String,
    /// What the box does.
    pub kind: BoxKind,
    input_ports: IndexMap<String, Port>,
    output_ports: IndexMap<String, Port>,
}

impl PipelineBox {
    /// Make a new box with the default ports of its kind, all unconnected.
    pub fn new<S: Into<String>>(name: S, kind: BoxKind) -> PipelineBox {
        PipelineBox {
            name: name.into(),
            kind,
            input_ports: kind
                .default_input_ports()
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
            output_ports: kind
                .default_output_ports()
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    /// Make a `data-in` box exporting the specified variable.
    pub fn data_in<S: Into<String>, V: Into<String>>(
        name: S,
        port_type: VariableType,
        variable: V,
    ) -> PipelineBox {
        let mut data = PipelineBox::new(name, BoxKind::DataIn);
        let variable = variable.into();
        data.output_ports.insert(
            variable.clone(),
            Port::new(variable.clone(), port_type).with_variable(variable),
        );
        data
    }

    /// Make a `data-out` box collecting the specified variable.
    pub fn data_out<S: Into<String>, V: Into<String>>(
        name: S,
        port_type: VariableType,
        variable: V,
    ) -> PipelineBox {
        let mut data = PipelineBox::new(name, BoxKind::DataOut);
        let variable = variable.into();
        data.input_ports.insert(
            variable.clone(),
            Port::new(variable.clone(), port_type).with_variable(variable),
        );
        data
    }

    /// Build a box from its configuration, checking the names and the types of the ports.
    pub fn from_spec(spec: &BoxSpec) -> Result<PipelineBox, ConfigError> {
        if spec.name.is_empty() {
            return Err(ConfigError::InvalidBox {
                box_name: spec.name.clone(),
                reason: "the name cannot be empty".into(),
            });
        }
        let kind = BoxKind::from_type(&spec.box_type)?;
        if kind.has_configurable_ports() {
            let (ports, others, direction) = match kind {
                BoxKind::DataIn => (&spec.ports_out, &spec.ports_in, "output"),
                _ => (&spec.ports_in, &spec.ports_out, "input"),
            };
            if ports.len() != 1 || !others.is_empty() {
                return Err(ConfigError::InvalidBox {
                    box_name: spec.name.clone(),
                    reason: format!(
                        "a {} box must have exactly one {} port",
                        kind.type_name(),
                        direction
                    ),
                });
            }
            let mut data = PipelineBox::new(&spec.name, kind);
            for (name, port) in ports {
                let port = Port::new(name, port.port_type).with_variable(&port.value);
                match kind {
                    BoxKind::DataIn => data.output_ports.insert(name.clone(), port),
                    _ => data.input_ports.insert(name.clone(), port),
                };
            }
            return Ok(data);
        }

        let mut result = PipelineBox::new(&spec.name, kind);
        for (name, port) in &spec.ports_in {
            connect(&mut result.input_ports, &spec.name, name, port, "input")?;
        }
        for (name, port) in &spec.ports_out {
            connect(&mut result.output_ports, &spec.name, name, port, "output")?;
        }
        Ok(result)
    }

    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.input_ports.values()
    }

    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.output_ports.values()
    }

    pub fn input_ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.input_ports.values_mut()
    }

    pub fn output_ports_mut(&mut self) -> impl Iterator<Item = &mut Port> {
        self.output_ports.values_mut()
    }

    pub fn input_port(&self, name: &str) -> Option<&Port> {
        self.input_ports.get(name)
    }

    pub fn output_port(&self, name: &str) -> Option<&Port> {
        self.output_ports.get(name)
    }

    pub fn input_port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.input_ports.get_mut(name)
    }

    pub fn output_port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.output_ports.get_mut(name)
    }

    /// Connect an input port to a variable.
    pub fn bind_input<V: Into<String>>(
        &mut self,
        port: &str,
        variable: V,
    ) -> Result<&mut Self, ConfigError> {
        let name = self.name.clone();
        self.input_ports
            .get_mut(port)
            .ok_or_else(|| ConfigError::UnknownPort {
                box_name: name,
                port: port.to_string(),
                direction: "input",
            })?
            .connect(variable);
        Ok(self)
    }

    /// Connect an output port to a variable.
    pub fn bind_output<V: Into<String>>(
        &mut self,
        port: &str,
        variable: V,
    ) -> Result<&mut Self, ConfigError> {
        let name = self.name.clone();
        self.output_ports
            .get_mut(port)
            .ok_or_else(|| ConfigError::UnknownPort {
                box_name: name,
                port: port.to_string(),
                direction: "output",
            })?
            .connect(variable);
        Ok(self)
    }

    /// The single port of a data box.
    pub fn data_port(&self) -> Option<&Port> {
        match self.kind {
            BoxKind::DataIn => self.output_ports.values().next(),
            BoxKind::DataOut => self.input_ports.values().next(),
            _ => None,
        }
    }

    /// Lower the box into the tasks of the job configuration. Identifiers, dependencies and test
    /// ownership are assigned later by the compiler.
    pub fn compile(&self, params: &CompilationParams) -> Result<Vec<Task>, CompilationError> {
        match self.kind {
            BoxKind::DataIn | BoxKind::DataOut => Ok(vec![]),
            BoxKind::FetchFile | BoxKind::FetchFiles => fetch::compile(self, params),
            BoxKind::GccCompilation => compilation::compile(self, GCC_BINARY),
            BoxKind::GppCompilation => compilation::compile(self, GPP_BINARY),
            BoxKind::ElfExecution => execution::compile(self, params),
            BoxKind::Judge => judge::compile(self, params),
        }
    }

    /// The resolved value of a required input port, prefixed by `base` and the port directory.
    fn required_input(&self, port: &str, base: &str) -> Result<Vec<String>, InvariantViolation> {
        required(self, self.input_ports.get(port), port, base)
    }

    /// The resolved value of a required output port, prefixed by `base` and the port directory.
    fn required_output(&self, port: &str, base: &str) -> Result<Vec<String>, InvariantViolation> {
        required(self, self.output_ports.get(port), port, base)
    }

    /// The resolved value of an optional input port, prefixed. Unresolved and empty values are
    /// both `None`.
    fn optional_input(&self, port: &str, base: &str) -> Option<Vec<String>> {
        optional(self.input_ports.get(port), base)
    }

    /// The resolved value of an optional output port, prefixed.
    fn optional_output(&self, port: &str, base: &str) -> Option<Vec<String>> {
        optional(self.output_ports.get(port), base)
    }
}

/// The working directory of the box as seen from inside the sandbox.
pub(crate) fn working_dir(params: &CompilationParams) -> String {
    if params.directory.is_empty() {
        EVAL_DIR.to_string()
    } else {
        join_path(EVAL_DIR, params.directory)
    }
}

fn connect(
    ports: &mut IndexMap<String, Port>,
    box_name: &str,
    name: &str,
    spec: &PortSpec,
    direction: &'static str,
) -> Result<(), ConfigError> {
    let port = ports.get_mut(name).ok_or_else(|| ConfigError::UnknownPort {
        box_name: box_name.to_string(),
        port: name.to_string(),
        direction,
    })?;
    if port.port_type != spec.port_type {
        return Err(ConfigError::TypeMismatch {
            what: format!("port '{}' of box '{}'", name, box_name),
            expected: port.port_type,
            found: spec.port_type,
        });
    }
    port.connect(&spec.value);
    Ok(())
}

fn required(
    owner: &PipelineBox,
    port: Option<&Port>,
    name: &str,
    base: &str,
) -> Result<Vec<String>, InvariantViolation> {
    port.and_then(|p| p.prefixed_value(base))
        .map(|v| v.as_array())
        .ok_or_else(|| {
            InvariantViolation(format!(
                "required port '{}' of box '{}' ({}) has no value",
                name,
                owner.name,
                owner.kind.type_name()
            ))
        })
}

fn optional(port: Option<&Port>, base: &str) -> Option<Vec<String>> {
    port.and_then(|p| p.prefixed_value(base))
        .filter(|v| !v.is_empty())
        .map(|v| v.as_array())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn spec(yaml: &str) -> BoxSpec {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_from_type() {
        for kind in BoxKind::ALL {
            assert_eq!(BoxKind::from_type(kind.type_name()), Ok(kind));
        }
        assert_eq!(
            BoxKind::from_type("javac"),
            Err(ConfigError::UnknownBoxType("javac".into()))
        );
    }

    #[test]
    fn test_from_spec() {
        let b = PipelineBox::from_spec(&spec(
            "name: compilation
type: gcc
portsIn:
  source-files: {type: 'file[]', value: sources}
  args: {type: 'string[]', value: ''}
portsOut:
  binary-file: {type: file, value: binary}",
        ))
        .unwrap();
        assert_eq!(b.kind, BoxKind::GccCompilation);
        assert_eq!(
            b.input_port(ports::SOURCE_FILES).unwrap().variable(),
            Some("sources")
        );
        assert_eq!(b.input_port(ports::ARGS).unwrap().variable(), None);
        assert_eq!(
            b.output_port(ports::BINARY_FILE).unwrap().variable(),
            Some("binary")
        );
    }

    #[test]
    fn test_from_spec_wrong_port() {
        let err = PipelineBox::from_spec(&spec(
            "name: c
type: gcc
portsIn:
  sources: {type: 'file[]', value: sources}",
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPort { .. }));
        let err = PipelineBox::from_spec(&spec(
            "name: c
type: gcc
portsIn:
  source-files: {type: file, value: sources}",
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));
    }

    #[test]
    fn test_data_box_ports() {
        let b = PipelineBox::from_spec(&spec(
            "name: source
type: data-in
portsOut:
  in_data: {type: 'file[]', value: sources}",
        ))
        .unwrap();
        let port = b.data_port().unwrap();
        assert_eq!(port.port_type, VariableType::FileArray);
        assert_eq!(port.variable(), Some("sources"));

        let err = PipelineBox::from_spec(&spec(
            "name: out
type: data-out
portsOut:
  out_data: {type: file, value: binary}",
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBox { .. }));
    }

    #[test]
    fn test_unresolved_required_port() {
        let b = PipelineBox::new("exec", BoxKind::ElfExecution);
        let params = CompilationParams {
            test_id: Some("01"),
            directory: "01",
            limits: &[],
        };
        let err = b.compile(&params).unwrap_err();
        assert!(!err.is_config());
    }
}
