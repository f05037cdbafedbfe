use thiserror::Error;

use crate::VariableType;

/// An error in the exercise configuration. These errors are caused by the author of the exercise
/// (or of the pipelines) and can be fixed by changing the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file cannot be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
    /// A test references a pipeline that does not exist.
    #[error("pipeline '{0}' not found")]
    MissingPipeline(String),
    /// A variable is not present in the table it should be looked up in.
    #[error("variable '{0}' could not be resolved")]
    UnresolvedVariable(String),
    /// A reference points to a variable missing in both the environment and the exercise tables.
    #[error("variable reference '{0}' could not be resolved")]
    UnresolvedReference(String),
    /// A wildcard did not match any of the submitted files.
    #[error("none of the submitted files matched the pattern '{pattern}' of variable '{variable}', the value cannot be empty")]
    NoFileMatched {
        /// The variable holding the pattern.
        variable: String,
        /// The pattern itself.
        pattern: String,
    },
    /// A remote file has no hash in the file table.
    #[error("remote file '{0}' is not present in the file table")]
    MissingFile(String),
    /// The merged graph is not consistent (e.g. the two ends of an edge disagree).
    #[error("malformed tree - {0}")]
    MalformedGraph(String),
    /// A variable can be bound to more than one producer.
    #[error("variable '{variable}' is bound ambiguously: {reason}")]
    AmbiguousBinding {
        /// The ambiguous variable.
        variable: String,
        /// What makes it ambiguous.
        reason: String,
    },
    /// Two things that must have the same type do not.
    #[error("type mismatch on '{what}': expected {expected}, found {found}")]
    TypeMismatch {
        /// What was being checked.
        what: String,
        /// The type required.
        expected: VariableType,
        /// The type actually found.
        found: VariableType,
    },
    /// The boxes depend on each other in a loop.
    #[error("dependency cycle detected, box '{0}' is part of it")]
    Cycle(String),
    /// A box has a type that is not known.
    #[error("unknown box type '{0}'")]
    UnknownBoxType(String),
    /// A box declares a port it does not have.
    #[error("box '{box_name}' has no {direction} port named '{port}'")]
    UnknownPort {
        /// The box with the wrong port.
        box_name: String,
        /// The name of the port.
        port: String,
        /// Either `input` or `output`.
        direction: &'static str,
    },
    /// The same name is used twice where it should be unique.
    #[error("duplicate {what} '{name}'")]
    Duplicate {
        /// What is duplicated (variable, box, ...).
        what: &'static str,
        /// The repeated name.
        name: String,
    },
    /// A variable is not well formed.
    #[error("invalid variable '{name}': {reason}")]
    InvalidVariable {
        /// The name of the variable.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A box is not configured correctly.
    #[error("invalid box '{box_name}': {reason}")]
    InvalidBox {
        /// The name of the box.
        box_name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// A test has no limits for a hardware group.
    #[error("limits for test '{test}' not found in hardware group '{hw_group}'")]
    MissingLimits {
        /// The test without limits.
        test: String,
        /// The hardware group missing them.
        hw_group: String,
    },
    /// The limits of a test are not meaningful.
    #[error("invalid limits for test '{test}': {reason}")]
    InvalidLimits {
        /// The test with the bad limits.
        test: String,
        /// What is wrong with them.
        reason: String,
    },
    /// A test does not produce the tasks its results are read from.
    #[error("test '{test}' has no {missing} task")]
    IncompleteTest {
        /// The incomplete test.
        test: String,
        /// Either `execution` or `evaluation`.
        missing: &'static str,
    },
    /// The environment is not part of the exercise.
    #[error("environment '{0}' is not configured")]
    UnknownEnvironment(String),
    /// Another error, with the place of the configuration where it happened.
    #[error("{inner} ({})", location(.test, .environment, .pipeline))]
    Located {
        /// The test being compiled.
        test: String,
        /// The runtime environment being compiled.
        environment: String,
        /// The pipeline the error comes from, if known.
        pipeline: Option<String>,
        /// The actual error.
        inner: Box<ConfigError>,
    },
}

fn location(test: &str, environment: &str, pipeline: &Option<String>) -> String {
    match pipeline {
        Some(pipeline) => format!(
            "test '{}', environment '{}', pipeline '{}'",
            test, environment, pipeline
        ),
        None => format!("test '{}', environment '{}'", test, environment),
    }
}

impl ConfigError {
    /// Attach the location to this error. An error already located is left as is.
    pub fn located<S: Into<String>, E: Into<String>>(
        self,
        test: S,
        environment: E,
        pipeline: Option<String>,
    ) -> ConfigError {
        match self {
            ConfigError::Located { .. } => self,
            inner => ConfigError::Located {
                test: test.into(),
                environment: environment.into(),
                pipeline,
                inner: Box::new(inner),
            },
        }
    }

    /// The error without its location.
    pub fn root(&self) -> &ConfigError {
        match self {
            ConfigError::Located { inner, .. } => inner.root(),
            other => other,
        }
    }
}

/// A violation of an internal invariant of the compiler: this is a bug, not something the author
/// of the exercise can fix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("internal compiler error: {0}")]
pub struct InvariantViolation(pub String);

/// Any error produced while compiling an exercise.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompilationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Internal(#[from] InvariantViolation),
}

impl CompilationError {
    /// Attach the location to a configuration error, internal errors are left untouched.
    pub fn located<S: Into<String>, E: Into<String>>(
        self,
        test: S,
        environment: E,
        pipeline: Option<String>,
    ) -> CompilationError {
        match self {
            CompilationError::Config(e) => {
                CompilationError::Config(e.located(test, environment, pipeline))
            }
            internal => internal,
        }
    }

    /// Whether the error is caused by the configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, CompilationError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_located_display() {
        let err = ConfigError::UnresolvedVariable("binary".into()).located(
            "01",
            "c-gcc-linux",
            Some("compilation".into()),
        );
        assert_eq!(
            err.to_string(),
            "variable 'binary' could not be resolved (test '01', environment 'c-gcc-linux', pipeline 'compilation')"
        );
        assert_eq!(
            err.root(),
            &ConfigError::UnresolvedVariable("binary".into())
        );
    }

    #[test]
    fn test_located_only_once() {
        let err = ConfigError::Cycle("a".into())
            .located("01", "env", None)
            .located("02", "env2", None);
        assert_eq!(err.to_string(), "dependency cycle detected, box 'a' is part of it (test '01', environment 'env')");
    }

    #[test]
    fn test_internal_not_located() {
        let err: CompilationError = InvariantViolation("boom".into()).into();
        let err = err.located("01", "env", None);
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "internal compiler error: boom");
    }
}
