use std::collections::{BTreeMap, HashMap};
use std::convert::TryFrom;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{BoxKind, BoxSpec, ConfigError, PipelineBox, VariablesTable};

/// How a pipeline is written in its configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub id: String,
    #[serde(default)]
    pub boxes: Vec<BoxSpec>,
    #[serde(default)]
    pub variables: VariablesTable,
    /// Hashes of the remote files of the pipeline, by name.
    #[serde(default)]
    pub files: IndexMap<String, String>,
}

/// A reusable graph of boxes, connected through the names of the variables of their ports.
///
/// The pipelines are independent of the exercises: an exercise instantiates them for its tests,
/// binding the `data-in` boxes to its own variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PipelineSpec")]
pub struct Pipeline {
    /// The identifier the exercises reference the pipeline with.
    pub id: String,
    /// The boxes, in declaration order.
    pub boxes: Vec<PipelineBox>,
    /// The constants of the pipeline and the references to the exercise variables.
    pub variables: VariablesTable,
    /// Hashes of the remote files of the pipeline, by name.
    pub files: IndexMap<String, String>,
}

impl Pipeline {
    pub fn new<S: Into<String>>(id: S) -> Pipeline {
        Pipeline {
            id: id.into(),
            boxes: vec![],
            variables: VariablesTable::new(),
            files: IndexMap::new(),
        }
    }

    /// Build a pipeline from its configuration. The names of the boxes must be unique.
    pub fn from_spec(spec: PipelineSpec) -> Result<Pipeline, ConfigError> {
        let mut pipeline = Pipeline::new(spec.id);
        pipeline.variables = spec.variables;
        pipeline.files = spec.files;
        for b in &spec.boxes {
            pipeline.add_box(PipelineBox::from_spec(b)?)?;
        }
        debug!(
            "Loaded pipeline '{}' with {} boxes",
            pipeline.id,
            pipeline.boxes.len()
        );
        Ok(pipeline)
    }

    /// Parse a pipeline from its YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Pipeline, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Append a box to the pipeline.
    pub fn add_box(&mut self, b: PipelineBox) -> Result<&mut Self, ConfigError> {
        if self.boxes.iter().any(|other| other.name == b.name) {
            return Err(ConfigError::Duplicate {
                what: "box",
                name: b.name,
            });
        }
        self.boxes.push(b);
        Ok(self)
    }

    /// The variables exported by the `data-in` boxes, that must be provided from outside.
    pub fn input_variables(&self) -> impl Iterator<Item = &str> {
        self.data_variables(BoxKind::DataIn)
    }

    /// The variables collected by the `data-out` boxes, visible to the following pipelines.
    pub fn output_variables(&self) -> impl Iterator<Item = &str> {
        self.data_variables(BoxKind::DataOut)
    }

    fn data_variables(&self, kind: BoxKind) -> impl Iterator<Item = &str> {
        self.boxes
            .iter()
            .filter(move |b| b.kind == kind)
            .filter_map(|b| b.data_port().and_then(|p| p.variable()))
    }

    /// The names of all the variables connected to some port of the pipeline.
    pub fn used_variables(&self) -> impl Iterator<Item = &str> {
        self.boxes.iter().flat_map(|b| {
            b.input_ports()
                .chain(b.output_ports())
                .filter_map(|p| p.variable())
        })
    }

    /// The names the references of the pipeline variables point to, to be found in the
    /// environment or in the exercise.
    pub fn referenced_variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().filter_map(|v| v.reference())
    }
}

impl TryFrom<PipelineSpec> for Pipeline {
    type Error = ConfigError;

    fn try_from(spec: PipelineSpec) -> Result<Self, Self::Error> {
        Pipeline::from_spec(spec)
    }
}

/// Source of the pipelines referenced by the exercises.
pub trait PipelineProvider {
    /// The pipeline with the specified identifier, if it exists.
    fn pipeline(&self, id: &str) -> Option<&Pipeline>;
}

impl PipelineProvider for HashMap<String, Pipeline> {
    fn pipeline(&self, id: &str) -> Option<&Pipeline> {
        self.get(id)
    }
}

impl PipelineProvider for BTreeMap<String, Pipeline> {
    fn pipeline(&self, id: &str) -> Option<&Pipeline> {
        self.get(id)
    }
}

impl PipelineProvider for IndexMap<String, Pipeline> {
    fn pipeline(&self, id: &str) -> Option<&Pipeline> {
        self.get(id)
    }
}

impl PipelineProvider for [Pipeline] {
    fn pipeline(&self, id: &str) -> Option<&Pipeline> {
        self.iter().find(|p| p.id == id)
    }
}

impl PipelineProvider for Vec<Pipeline> {
    fn pipeline(&self, id: &str) -> Option<&Pipeline> {
        self.as_slice().pipeline(id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const COMPILATION: &str = r#"
id: compilation
boxes:
  - name: source
    type: data-in
    portsOut:
      in_data: {type: "file[]", value: source_files}
  - name: compilation
    type: gcc
    portsIn:
      source-files: {type: "file[]", value: source_files}
    portsOut:
      binary-file: {type: file, value: binary}
  - name: output
    type: data-out
    portsIn:
      out_data: {type: file, value: binary}
variables:
  - {name: source_files, type: "file[]", value: "$source-files"}
  - {name: binary, type: file, value: a.out}
"#;

    #[test]
    fn test_from_yaml() {
        let pipeline = Pipeline::from_yaml(COMPILATION).unwrap();
        assert_eq!(pipeline.id, "compilation");
        assert_eq!(pipeline.boxes.len(), 3);
        assert_eq!(
            pipeline.input_variables().collect::<Vec<_>>(),
            vec!["source_files"]
        );
        assert_eq!(pipeline.output_variables().collect::<Vec<_>>(), vec!["binary"]);
        assert_eq!(pipeline.variables.len(), 2);
        assert_eq!(
            pipeline.referenced_variables().collect::<Vec<_>>(),
            vec!["source-files"]
        );
    }

    #[test]
    fn test_duplicate_box() {
        let mut pipeline = Pipeline::new("p");
        pipeline
            .add_box(PipelineBox::new("a", BoxKind::Judge))
            .unwrap();
        let err = pipeline
            .add_box(PipelineBox::new("a", BoxKind::ElfExecution))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Duplicate {
                what: "box",
                name: "a".into()
            }
        );
    }

    #[test]
    fn test_unknown_box_type() {
        let err = Pipeline::from_yaml("id: p\nboxes:\n  - {name: a, type: javac}").unwrap_err();
        assert!(err.to_string().contains("unknown box type 'javac'"));
    }

    #[test]
    fn test_provider() {
        let pipelines = vec![Pipeline::new("a"), Pipeline::new("b")];
        assert!(pipelines.pipeline("b").is_some());
        assert!(pipelines.pipeline("c").is_none());
    }
}
