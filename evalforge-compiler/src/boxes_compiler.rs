use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use evalforge_config::{
    join_path, CompilationError, CompilationParams, ConfigError, ExerciseLimits,
    InvariantViolation,
};
use evalforge_job::commands::MKDIR;
use evalforge_job::dirs::SOURCE_DIR;
use evalforge_job::{HwGroupLimits, JobConfig, SubmissionHeader, Task, TaskId, TaskType};

use crate::{OptimizedNode, TestDirectories};

/// Prefix of the identifiers of the tasks of the boxes shared between tests.
pub const SHARED_PREFIX: &str = "shared";

/// Lowers the optimized boxes into the tasks of the job.
///
/// The tasks get deterministic identifiers (`<test directory>.<box>` or `shared.<box>`, with a
/// `.<n>` suffix for boxes producing many tasks) and depend on the last task of the boxes
/// producing their inputs. Before any box a `mkdir` task creates every working directory.
pub struct BoxesCompiler<'a> {
    environment: &'a str,
    limits: &'a IndexMap<String, ExerciseLimits>,
}

/// Hands out unique task identifiers.
#[derive(Debug, Default)]
struct TaskIds {
    used: HashSet<TaskId>,
}

impl TaskIds {
    /// The identifier itself if not used yet, otherwise the first free `<id>-<k>` with `k >= 2`.
    fn allocate(&mut self, id: String) -> TaskId {
        let mut candidate = id.clone();
        let mut ordinal = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}", id, ordinal);
            ordinal += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

impl<'a> BoxesCompiler<'a> {
    pub fn new(environment: &'a str, limits: &'a IndexMap<String, ExerciseLimits>) -> Self {
        BoxesCompiler {
            environment,
            limits,
        }
    }

    pub fn compile(
        &self,
        nodes: &[OptimizedNode],
        directories: &TestDirectories,
        header: SubmissionHeader,
    ) -> Result<JobConfig, CompilationError> {
        let test_limits = self.test_limits(directories)?;
        let mut ids = TaskIds::default();
        let mut tasks: Vec<Task> = vec![];

        let mut mkdirs: HashMap<&str, TaskId> = HashMap::new();
        for dir in directories.all() {
            let mut task = Task::new(TaskType::Inner, MKDIR);
            task.args(vec![join_path(SOURCE_DIR, dir)]);
            task.task_id = ids.allocate(format!("{}.{}", dir, MKDIR));
            mkdirs.insert(dir, task.task_id.clone());
            tasks.push(task);
        }

        // the tasks a box depending on a node has to wait for
        let mut provides: Vec<Vec<TaskId>> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut producers: Vec<TaskId> = vec![];
            if let Some(mkdir) = mkdirs.get(node.directory.as_str()) {
                producers.push(mkdir.clone());
            }
            for parent in node.parent_nodes() {
                let parent_tasks = provides.get(parent).ok_or_else(|| {
                    InvariantViolation(format!(
                        "box '{}' is compiled before its producers",
                        node.pipeline_box.name
                    ))
                })?;
                for task in parent_tasks {
                    if !producers.contains(task) {
                        producers.push(task.clone());
                    }
                }
            }

            let limits = node
                .test_id
                .as_ref()
                .and_then(|test| test_limits.get(test))
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let params = CompilationParams {
                test_id: node.test_id.as_deref(),
                directory: &node.directory,
                limits,
            };
            let mut box_tasks = node.pipeline_box.compile(&params).map_err(|e| {
                let test = node.test_id.as_ref().or(node.tests.first());
                e.located(
                    test.cloned().unwrap_or_default(),
                    self.environment,
                    Some(node.pipeline.clone()),
                )
            })?;
            if box_tasks.is_empty() {
                // boxes without tasks are transparent for the dependencies
                provides.push(producers);
                continue;
            }

            let prefix = if node.directory.is_empty() {
                SHARED_PREFIX
            } else {
                node.directory.as_str()
            };
            let base = format!("{}.{}", prefix, node.pipeline_box.name);
            let multiple = box_tasks.len() > 1;
            let mut previous: Option<TaskId> = None;
            for (index, task) in box_tasks.iter_mut().enumerate() {
                let id = if multiple {
                    format!("{}.{}", base, index + 1)
                } else {
                    base.clone()
                };
                task.task_id = ids.allocate(id);
                match &previous {
                    Some(previous) => {
                        task.depends_on(previous.clone());
                    }
                    None => {
                        for producer in &producers {
                            task.depends_on(producer.clone());
                        }
                    }
                }
                task.test_id = node.test_id.clone();
                previous = Some(task.task_id.clone());
            }
            provides.push(previous.into_iter().collect());
            tasks.extend(box_tasks);
        }

        let job = JobConfig::new(header, tasks);
        job.validate()
            .map_err(|e| InvariantViolation(format!("invalid job produced: {}", e)))?;
        debug!("Compiled {} tasks", job.tasks().len());
        Ok(job)
    }

    /// The limits of every test in every hardware group, checking that none is missing.
    fn test_limits(
        &self,
        directories: &TestDirectories,
    ) -> Result<HashMap<String, Vec<HwGroupLimits>>, CompilationError> {
        let mut result: HashMap<String, Vec<HwGroupLimits>> = HashMap::new();
        for test in directories.tests.keys() {
            let mut limits = vec![];
            for (hw_group, exercise_limits) in self.limits {
                let locate = |e: ConfigError| e.located(test.as_str(), self.environment, None);
                let test_limits = exercise_limits.get(test).ok_or_else(|| {
                    locate(ConfigError::MissingLimits {
                        test: test.clone(),
                        hw_group: hw_group.clone(),
                    })
                })?;
                test_limits
                    .validate()
                    .map_err(|reason| {
                        locate(ConfigError::InvalidLimits {
                            test: test.clone(),
                            reason,
                        })
                    })?;
                limits.push(HwGroupLimits {
                    hw_group_id: hw_group.clone(),
                    limits: test_limits.clone(),
                });
            }
            result.insert(test.clone(), limits);
        }
        Ok(result)
    }
}
