use std::collections::HashSet;

use evalforge_config::{CompilationError, ConfigError, Exercise, PipelineProvider, VariablesTable};
use evalforge_diagnostics::{Diagnostic, DiagnosticContext};
use evalforge_job::SubmissionHeader;
use evalforge_results::ScoreCalculatorAccessor;

use crate::Compiler;

/// Prefix of the names of the files submitted by the dry-run compilation.
const CONJURED_PREFIX: &str = "recodex";
/// Length of the random part of the conjured file names.
const CONJURED_RANDOM_LEN: usize = 20;

/// Checks that an exercise can be compiled and scored, before any real submission arrives.
///
/// Every runtime environment is compiled for a fake submission made of a single file with the first
/// extension of the environment.
pub struct ExerciseChecker<'a, P: PipelineProvider + ?Sized> {
    pipelines: &'a P,
    calculators: &'a ScoreCalculatorAccessor,
}

impl<'a, P: PipelineProvider + ?Sized> ExerciseChecker<'a, P> {
    pub fn new(pipelines: &'a P, calculators: &'a ScoreCalculatorAccessor) -> Self {
        ExerciseChecker {
            pipelines,
            calculators,
        }
    }

    /// Check the exercise, returning all the problems found.
    pub fn check(&self, exercise: &Exercise) -> DiagnosticContext {
        let mut diagnostics = DiagnosticContext::new();
        if exercise.config.environments.is_empty() {
            diagnostics.add_diagnostic(
                Diagnostic::error("The exercise has no runtime environments")
                    .with_help("Add at least one environment to the exercise configuration"),
            );
            return diagnostics;
        }
        self.check_environment_configs(exercise, &mut diagnostics);
        let hw_groups: Vec<&str> = exercise.hw_groups().collect();
        if hw_groups.is_empty() {
            diagnostics.add_diagnostic(
                Diagnostic::error("The exercise has no hardware groups")
                    .with_help("Add the limits of at least one hardware group"),
            );
            return diagnostics;
        }

        for environment in &exercise.config.environments {
            // reported by the check of the environment configurations
            if !exercise.environments.contains_key(environment) {
                continue;
            }
            self.check_environment(exercise, environment, &hw_groups, &mut diagnostics);
        }
        self.check_score(exercise, &mut diagnostics);
        self.check_pipeline_variables(exercise, &mut diagnostics);
        diagnostics
    }

    fn check_environment(
        &self,
        exercise: &Exercise,
        environment: &str,
        hw_groups: &[&str],
        diagnostics: &mut DiagnosticContext,
    ) {
        let missing_limits: Vec<&str> = hw_groups
            .iter()
            .copied()
            .filter(|hw_group| {
                exercise
                    .limits
                    .get(*hw_group)
                    .map_or(true, |envs| !envs.contains_key(environment))
            })
            .collect();
        for hw_group in &missing_limits {
            diagnostics.add_diagnostic(
                Diagnostic::error(format!(
                    "Missing limits of environment '{}' in hardware group '{}'",
                    environment, hw_group
                ))
                .with_note(format!("environment '{}'", environment)),
            );
        }
        if !missing_limits.is_empty() {
            return;
        }

        let extension = exercise
            .environments
            .get(environment)
            .and_then(|env| env.extensions.first())
            .map(String::as_str);
        let submitted = vec![conjure_file_name(extension)];
        debug!(
            "Checking environment '{}' with submitted file {:?}",
            environment, submitted
        );
        let header = SubmissionHeader::new("check", "reference");
        let compiler = Compiler::new(self.pipelines);
        if let Err(err) = compiler.compile(exercise, environment, &submitted, header) {
            diagnostics.add_diagnostic(compilation_diagnostic(environment, &err));
        }
    }

    fn check_score(&self, exercise: &Exercise, diagnostics: &mut DiagnosticContext) {
        let calculator = self.calculators.calculator(&exercise.score.calculator);
        let tests: Vec<String> = exercise.config.test_ids().map(String::from).collect();
        if let Err(err) = calculator.validate_config(&exercise.score.config, &tests) {
            diagnostics.add_diagnostic(
                Diagnostic::error(format!("Invalid score configuration: {}", err))
                    .with_note(format!("score calculator '{}'", calculator.name())),
            );
        }
    }

    /// Every environment of the exercise needs its own configuration, and every configuration
    /// must belong to an environment of the exercise.
    fn check_environment_configs(
        &self,
        exercise: &Exercise,
        diagnostics: &mut DiagnosticContext,
    ) {
        for environment in &exercise.config.environments {
            if !exercise.environments.contains_key(environment) {
                diagnostics.add_diagnostic(
                    Diagnostic::error(format!(
                        "Environment '{}' has no environment-specific configuration",
                        environment
                    ))
                    .with_note(format!("environment '{}'", environment)),
                );
            }
        }
        for environment in exercise.environments.keys() {
            if !exercise.config.environments.contains(environment) {
                diagnostics.add_diagnostic(
                    Diagnostic::error(format!(
                        "Environment-specific configuration of '{}' does not match any environment of the exercise",
                        environment
                    ))
                    .with_note(format!("environment '{}'", environment)),
                );
            }
        }
    }

    /// Check the variables the tests bind for their pipelines: every binding must be used by the
    /// pipeline, every remote file must be known and every reference of the pipeline must be
    /// bound either by the environment or by the test.
    fn check_pipeline_variables(
        &self,
        exercise: &Exercise,
        diagnostics: &mut DiagnosticContext,
    ) {
        let no_variables = VariablesTable::new();
        for (test, config) in &exercise.config.tests {
            for (environment, test_env) in &config.environments {
                let environment_variables = exercise
                    .environments
                    .get(environment)
                    .map_or(&no_variables, |env| &env.variables);
                let mut previous_outputs: HashSet<&str> = HashSet::new();
                for vars in &test_env.pipelines {
                    // missing pipelines are reported by the compilation
                    let Some(pipeline) = self.pipelines.pipeline(&vars.name) else {
                        previous_outputs.clear();
                        continue;
                    };
                    let note = format!(
                        "test '{}', environment '{}', pipeline '{}'",
                        test, environment, vars.name
                    );

                    let used: HashSet<&str> = pipeline
                        .used_variables()
                        .chain(pipeline.referenced_variables())
                        .collect();
                    for variable in vars.variables.iter() {
                        if !used.contains(variable.name.as_str()) {
                            diagnostics.add_diagnostic(
                                Diagnostic::error(format!(
                                    "Variable '{}' is redundant, the pipeline does not use it",
                                    variable.name
                                ))
                                .with_note(note.clone()),
                            );
                            continue;
                        }
                        if !variable.is_remote_file() || variable.is_reference() {
                            continue;
                        }
                        for file in variable.value_as_array() {
                            let known = file.is_empty()
                                || exercise.files.contains_key(&file)
                                || pipeline.files.contains_key(&file);
                            if !known {
                                diagnostics.add_diagnostic(
                                    Diagnostic::error(format!(
                                        "Remote file '{}' of variable '{}' is not present in the exercise files",
                                        file, variable.name
                                    ))
                                    .with_note(note.clone()),
                                );
                            }
                        }
                    }

                    // the data-in boxes fed by the previous pipeline need no value
                    let fed: HashSet<&str> = pipeline
                        .input_variables()
                        .filter(|v| previous_outputs.contains(v))
                        .collect();
                    let mut missing: Vec<&str> = vec![];
                    for name in pipeline.used_variables() {
                        if fed.contains(name) {
                            continue;
                        }
                        let reference = pipeline.variables.get(name).and_then(|v| v.reference());
                        let Some(reference) = reference else {
                            continue;
                        };
                        let bound = environment_variables.contains(reference)
                            || vars.variables.contains(reference);
                        if !bound && !missing.contains(&reference) {
                            missing.push(reference);
                        }
                    }
                    if !missing.is_empty() {
                        diagnostics.add_diagnostic(
                            Diagnostic::error(format!(
                                "Missing values for variables: {}",
                                missing.join(", ")
                            ))
                            .with_note(note)
                            .with_help("Bind them in the environment or in the test"),
                        );
                    }
                    previous_outputs = pipeline.output_variables().collect();
                }
            }
        }
    }
}

/// A file name no real submission uses: `recodex.<random>.<extension>`.
fn conjure_file_name(extension: Option<&str>) -> String {
    let random: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(CONJURED_RANDOM_LEN)
        .collect();
    match extension {
        Some(ext) => format!("{}.{}.{}", CONJURED_PREFIX, random, ext.trim_start_matches('.')),
        None => format!("{}.{}", CONJURED_PREFIX, random),
    }
}

fn compilation_diagnostic(environment: &str, err: &CompilationError) -> Diagnostic {
    match err {
        CompilationError::Config(ConfigError::Located {
            test,
            environment,
            pipeline,
            inner,
        }) => {
            let mut note = format!("test '{}', environment '{}'", test, environment);
            if let Some(pipeline) = pipeline {
                note += &format!(", pipeline '{}'", pipeline);
            }
            Diagnostic::error(format!("The exercise cannot be compiled: {}", inner)).with_note(note)
        }
        CompilationError::Config(inner) => {
            Diagnostic::error(format!("The exercise cannot be compiled: {}", inner))
                .with_note(format!("environment '{}'", environment))
        }
        CompilationError::Internal(inner) => Diagnostic::error(inner.to_string())
            .with_note(format!("environment '{}'", environment))
            .with_help("This is a bug of the compiler, not of the exercise"),
    }
}
