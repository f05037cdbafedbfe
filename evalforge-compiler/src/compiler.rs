use indexmap::IndexMap;

use evalforge_config::{
    CompilationError, ConfigError, Exercise, ExerciseConfig, ExerciseLimits, PipelineProvider,
    VariablesTable,
};
use evalforge_job::{JobConfig, SubmissionHeader, TaskType};

use crate::{
    BoxesCompiler, BoxesOptimizer, BoxesSorter, PipelinesMerger, TestDirectoriesResolver,
    VariablesResolver,
};

/// Everything the compilation of an exercise depends on, besides its configuration.
#[derive(Debug, Clone, Copy)]
pub struct CompilationContext<'a> {
    /// The runtime environment to compile for.
    pub environment: &'a str,
    /// The variables of the runtime environment.
    pub environment_variables: &'a VariablesTable,
    /// Hashes of the remote files of the exercise.
    pub exercise_files: &'a IndexMap<String, String>,
    /// The limits of the tests, by hardware group.
    pub limits: &'a IndexMap<String, ExerciseLimits>,
    /// The names of the submitted files.
    pub submitted_files: &'a [String],
}

/// Compiles the configuration of an exercise into the job evaluating a submission.
///
/// The compilation goes through these steps:
/// - the pipelines of every test are merged into a single tree per test;
/// - the variables of the trees are resolved;
/// - the boxes of every tree are sorted;
/// - the boxes doing the same work in many tests are merged;
/// - every box is placed in a working directory;
/// - the boxes are lowered into tasks;
/// - every test is checked to have both an execution and an evaluation task.
///
/// ```
/// use evalforge_compiler::Compiler;
/// use evalforge_config::{Exercise, Pipeline};
/// use evalforge_job::SubmissionHeader;
///
/// let pipelines: Vec<Pipeline> = vec![];
/// let exercise = Exercise::default();
/// let compiler = Compiler::new(&pipelines);
/// // the environment is not part of the exercise
/// let result = compiler.compile(&exercise, "c", &[], SubmissionHeader::new("1", "student"));
/// assert!(result.is_err());
/// ```
pub struct Compiler<'a, P: PipelineProvider + ?Sized> {
    pipelines: &'a P,
}

impl<'a, P: PipelineProvider + ?Sized> Compiler<'a, P> {
    pub fn new(pipelines: &'a P) -> Self {
        Compiler { pipelines }
    }

    /// Compile the exercise for a submission in the specified environment.
    pub fn compile(
        &self,
        exercise: &Exercise,
        environment: &str,
        submitted_files: &[String],
        header: SubmissionHeader,
    ) -> Result<JobConfig, CompilationError> {
        if !exercise.config.environments.iter().any(|e| e == environment) {
            return Err(ConfigError::UnknownEnvironment(environment.to_string()).into());
        }
        let environment_config = exercise
            .environments
            .get(environment)
            .ok_or_else(|| ConfigError::UnknownEnvironment(environment.to_string()))?;
        let limits = exercise.environment_limits(environment);
        let context = CompilationContext {
            environment,
            environment_variables: &environment_config.variables,
            exercise_files: &exercise.files,
            limits: &limits,
            submitted_files,
        };
        self.compile_config(&exercise.config, &context, header)
    }

    /// Compile an exercise configuration with explicit tables and limits.
    pub fn compile_config(
        &self,
        config: &ExerciseConfig,
        context: &CompilationContext,
        mut header: SubmissionHeader,
    ) -> Result<JobConfig, CompilationError> {
        info!(
            "Compiling {} tests for environment '{}'",
            config.tests.len(),
            context.environment
        );
        let merger = PipelinesMerger::new(self.pipelines);
        let resolver = VariablesResolver::new(
            context.environment_variables,
            context.exercise_files,
            context.submitted_files,
        );
        let mut sorted = vec![];
        for mut tree in merger.merge(config, context.environment)? {
            resolver.resolve(&mut tree)?;
            let order = BoxesSorter::sort(&tree)?;
            sorted.push((tree, order));
        }
        let mut nodes = BoxesOptimizer::optimize(&sorted);
        let tests: Vec<String> = config.test_ids().map(String::from).collect();
        let directories = TestDirectoriesResolver::resolve(&tests, &mut nodes);
        if header.hw_groups.is_empty() {
            header.hw_groups = context.limits.keys().cloned().collect();
        }
        let job = BoxesCompiler::new(context.environment, context.limits).compile(
            &nodes,
            &directories,
            header,
        )?;
        for test in &tests {
            check_test_tasks(&job, test, context.environment)?;
        }
        Ok(job)
    }
}

/// Every test must run the submission and judge its output, otherwise its results cannot be
/// interpreted.
fn check_test_tasks(job: &JobConfig, test: &str, environment: &str) -> Result<(), ConfigError> {
    for (task_type, missing) in [
        (TaskType::Execution, "execution"),
        (TaskType::Evaluation, "evaluation"),
    ] {
        if !job.test_tasks(test).any(|t| t.task_type == task_type) {
            return Err(ConfigError::IncompleteTest {
                test: test.to_string(),
                missing,
            }
            .located(test, environment, None));
        }
    }
    Ok(())
}
