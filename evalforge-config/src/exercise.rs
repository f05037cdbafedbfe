use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use evalforge_job::Limits;

use crate::{ConfigError, VariablesTable};

/// A pipeline used by a test, with the exercise variables bound for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVars {
    /// The identifier of the pipeline.
    pub name: String,
    /// The values the references of the pipeline resolve to.
    #[serde(default)]
    pub variables: VariablesTable,
}

/// The pipelines of a test in a single runtime environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEnvironment {
    /// The pipelines, in the order their data flows.
    #[serde(default)]
    pub pipelines: Vec<PipelineVars>,
}

/// How a test is evaluated in every runtime environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub environments: IndexMap<String, TestEnvironment>,
}

/// The evaluation structure of an exercise: which pipelines every test runs in every environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// The runtime environments the exercise supports.
    #[serde(default)]
    pub environments: Vec<String>,
    /// The tests, in order.
    #[serde(default)]
    pub tests: IndexMap<String, TestConfig>,
}

impl ExerciseConfig {
    /// The pipelines of the test for the environment, `None` if the test does not define them.
    pub fn pipelines(&self, test: &str, environment: &str) -> Option<&[PipelineVars]> {
        self.tests
            .get(test)?
            .environments
            .get(environment)
            .map(|e| e.pipelines.as_slice())
    }

    pub fn test_ids(&self) -> impl Iterator<Item = &str> {
        self.tests.keys().map(String::as_str)
    }
}

/// The variables of a runtime environment, usually the ones bound to the submitted files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub variables: VariablesTable,
    /// The extensions of the source files of the environment, without the dot.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// The limits of every test of an exercise, for a single environment and hardware group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseLimits {
    limits: IndexMap<String, Limits>,
}

impl ExerciseLimits {
    pub fn new() -> ExerciseLimits {
        ExerciseLimits::default()
    }

    /// Set the limits of a test.
    pub fn set<S: Into<String>>(&mut self, test: S, limits: Limits) -> &mut Self {
        self.limits.insert(test.into(), limits);
        self
    }

    /// The limits of a test.
    pub fn get(&self, test: &str) -> Option<&Limits> {
        self.limits.get(test)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Limits)> {
        self.limits.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check that every set of limits is meaningful.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (test, limits) in &self.limits {
            limits
                .validate()
                .map_err(|reason| ConfigError::InvalidLimits {
                    test: test.clone(),
                    reason,
                })?;
        }
        Ok(())
    }
}

/// Which score calculator to use and its configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// The name of the calculator, the default one if empty.
    #[serde(default)]
    pub calculator: String,
    /// The configuration of the calculator, its format depends on the calculator.
    #[serde(default)]
    pub config: serde_yaml::Value,
}

/// Everything an exercise is made of, as stored in its configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub config: ExerciseConfig,
    /// The runtime environments, by identifier.
    #[serde(default)]
    pub environments: IndexMap<String, EnvironmentConfig>,
    /// Hashes of the remote files of the exercise, by name.
    #[serde(default)]
    pub files: IndexMap<String, String>,
    /// The limits, by hardware group and then by environment.
    #[serde(default)]
    pub limits: IndexMap<String, IndexMap<String, ExerciseLimits>>,
    #[serde(default)]
    pub score: ScoreConfig,
}

impl Exercise {
    /// Parse an exercise from its YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Exercise, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The identifiers of the hardware groups the exercise has limits for.
    pub fn hw_groups(&self) -> impl Iterator<Item = &str> {
        self.limits.keys().map(String::as_str)
    }

    /// The limits of the environment in every hardware group. Hardware groups without limits for
    /// the environment are skipped.
    pub fn environment_limits(&self, environment: &str) -> IndexMap<String, ExerciseLimits> {
        self.limits
            .iter()
            .filter_map(|(hw_group, envs)| {
                envs.get(environment)
                    .map(|limits| (hw_group.clone(), limits.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const EXERCISE: &str = r#"
config:
  environments: [c-gcc-linux]
  tests:
    "01":
      environments:
        c-gcc-linux:
          pipelines:
            - name: compilation
            - name: test
              variables:
                - {name: input, type: remote-file, value: 01.in}
environments:
  c-gcc-linux:
    variables:
      - {name: source-files, type: "file[]", value: "*.c"}
    extensions: [c, h]
files:
  01.in: 0a1b2c
limits:
  group1:
    c-gcc-linux:
      "01": {time: 1.5, memory: 65536}
score:
  calculator: uniform
"#;

    #[test]
    fn test_from_yaml() {
        let exercise = Exercise::from_yaml(EXERCISE).unwrap();
        let pipelines = exercise.config.pipelines("01", "c-gcc-linux").unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[1].variables.len(), 1);
        assert_eq!(exercise.config.pipelines("01", "java"), None);
        assert_eq!(exercise.files.get("01.in").unwrap(), "0a1b2c");
        assert_eq!(exercise.hw_groups().collect::<Vec<_>>(), vec!["group1"]);
        assert_eq!(exercise.score.calculator, "uniform");

        let limits = exercise.environment_limits("c-gcc-linux");
        assert_eq!(limits["group1"].get("01").unwrap().time, Some(1.5));
        assert!(exercise.environment_limits("java").is_empty());
    }

    #[test]
    fn test_limits_validation() {
        let mut limits = ExerciseLimits::new();
        let mut bad = Limits::new();
        bad.time(0.0);
        limits.set("01", Limits::new()).set("02", bad);
        let err = limits.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLimits { test, .. } if test == "02"));
    }
}
