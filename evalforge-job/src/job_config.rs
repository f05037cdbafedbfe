use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Task, TaskId, TaskType};

/// An error in the structure of a job configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobConfigError {
    /// Two tasks share the same identifier.
    #[error("duplicate task id '{0}'")]
    DuplicateTaskId(TaskId),
    /// A task depends on a task that is not part of the job.
    #[error("task '{task}' depends on the unknown task '{dependency}'")]
    UnknownDependency {
        /// The task with the broken dependency.
        task: TaskId,
        /// The missing dependency.
        dependency: TaskId,
    },
    /// A task depends on a task that comes later in the list.
    #[error("task '{task}' depends on '{dependency}' which is scheduled after it")]
    DependencyOrder {
        /// The task with the misplaced dependency.
        task: TaskId,
        /// The dependency scheduled too late.
        dependency: TaskId,
    },
    /// A test lacks its execution or evaluation task.
    #[error("test '{test}' has no {missing} task")]
    IncompleteTest {
        /// The identifier of the incomplete test.
        test: String,
        /// Which kind of task is missing.
        missing: &'static str,
    },
    /// The configuration cannot be (de)serialized.
    #[error("invalid job configuration: {0}")]
    Serialization(String),
}

/// The header of a job, identifying the submission it evaluates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SubmissionHeader {
    /// Identifier of the submission.
    pub job_id: String,
    /// Type of the submission (e.g. `student` or `reference`).
    #[serde(rename = "type")]
    pub job_type: String,
    /// Hardware groups the job can be evaluated on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hw_groups: Vec<String>,
}

/// The ordered list of tasks of a submission, ready to be sent to the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobConfig {
    /// The header of the job.
    pub submission: SubmissionHeader,
    /// The tasks, in execution order.
    tasks: Vec<Task>,
}

/// The pair of tasks a test is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTasks {
    /// The identifier of the test.
    pub test_id: String,
    /// The task running the submitted program.
    pub execution: TaskId,
    /// The task judging the output of the execution.
    pub evaluation: TaskId,
}

impl SubmissionHeader {
    /// Make a new header for the specified submission.
    pub fn new<S: Into<String>, T: Into<String>>(job_id: S, job_type: T) -> SubmissionHeader {
        SubmissionHeader {
            job_id: job_id.into(),
            job_type: job_type.into(),
            hw_groups: vec![],
        }
    }
}

impl JobConfig {
    /// Build a job from its header and its ordered tasks.
    pub fn new(submission: SubmissionHeader, tasks: Vec<Task>) -> JobConfig {
        JobConfig { submission, tasks }
    }

    /// The full identifier of the job, as reported back by the worker.
    pub fn job_id(&self) -> String {
        format!("{}_{}", self.submission.job_type, self.submission.job_id)
    }

    /// The tasks of the job, in execution order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Search a task by its identifier.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// The tasks owned by the specified test.
    pub fn test_tasks<'a>(&'a self, test_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks
            .iter()
            .filter(move |t| t.test_id.as_deref() == Some(test_id))
    }

    /// Check the structure of the job: the identifiers must be unique and every dependency must
    /// refer to a task scheduled before the dependant one.
    pub fn validate(&self) -> Result<(), JobConfigError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let all: HashSet<&str> = self.tasks.iter().map(|t| t.task_id.as_str()).collect();
        for task in &self.tasks {
            for dep in &task.dependencies {
                if !seen.contains(dep.as_str()) {
                    if all.contains(dep.as_str()) {
                        return Err(JobConfigError::DependencyOrder {
                            task: task.task_id.clone(),
                            dependency: dep.clone(),
                        });
                    }
                    return Err(JobConfigError::UnknownDependency {
                        task: task.task_id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            if !seen.insert(task.task_id.as_str()) {
                return Err(JobConfigError::DuplicateTaskId(task.task_id.clone()));
            }
        }
        Ok(())
    }

    /// Pair the execution and the evaluation task of every test, in order of appearance. When a
    /// test has more than one task of a kind the last one is used.
    pub fn tests(&self) -> Result<Vec<TestTasks>, JobConfigError> {
        let mut tests: IndexMap<&str, (Option<&TaskId>, Option<&TaskId>)> = IndexMap::new();
        for task in &self.tasks {
            let Some(test_id) = task.test_id.as_deref() else {
                continue;
            };
            let entry = tests.entry(test_id).or_default();
            match task.task_type {
                TaskType::Execution => entry.0 = Some(&task.task_id),
                TaskType::Evaluation => entry.1 = Some(&task.task_id),
                _ => {}
            }
        }
        tests
            .into_iter()
            .map(|(test, (execution, evaluation))| {
                let execution = execution.ok_or_else(|| JobConfigError::IncompleteTest {
                    test: test.to_string(),
                    missing: "execution",
                })?;
                let evaluation = evaluation.ok_or_else(|| JobConfigError::IncompleteTest {
                    test: test.to_string(),
                    missing: "evaluation",
                })?;
                Ok(TestTasks {
                    test_id: test.to_string(),
                    execution: execution.clone(),
                    evaluation: evaluation.clone(),
                })
            })
            .collect()
    }

    /// Serialize the job in the YAML format understood by the worker.
    pub fn to_yaml(&self) -> Result<String, JobConfigError> {
        serde_yaml::to_string(self).map_err(|e| JobConfigError::Serialization(e.to_string()))
    }

    /// Parse a job previously serialized with [`to_yaml`](#method.to_yaml).
    pub fn from_yaml(yaml: &str) -> Result<JobConfig, JobConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| JobConfigError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn task(id: &str, task_type: TaskType, test: Option<&str>, deps: &[&str]) -> Task {
        let mut task = Task::new(task_type, "bin");
        task.task_id = id.into();
        task.test_id = test.map(String::from);
        for dep in deps {
            task.depends_on(*dep);
        }
        task
    }

    fn header() -> SubmissionHeader {
        SubmissionHeader::new("abc", "student")
    }

    #[test]
    fn test_job_id() {
        let job = JobConfig::new(header(), vec![]);
        assert_eq!(job.job_id(), "student_abc");
    }

    #[test]
    fn test_validate_ok() {
        let job = JobConfig::new(
            header(),
            vec![
                task("a", TaskType::Initiation, None, &[]),
                task("b", TaskType::Execution, Some("t"), &["a"]),
            ],
        );
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate() {
        let job = JobConfig::new(
            header(),
            vec![
                task("a", TaskType::Initiation, None, &[]),
                task("a", TaskType::Inner, None, &[]),
            ],
        );
        assert_eq!(
            job.validate(),
            Err(JobConfigError::DuplicateTaskId("a".into()))
        );
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let job = JobConfig::new(header(), vec![task("a", TaskType::Inner, None, &["x"])]);
        assert!(matches!(
            job.validate(),
            Err(JobConfigError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_validate_order() {
        let job = JobConfig::new(
            header(),
            vec![
                task("a", TaskType::Inner, None, &["b"]),
                task("b", TaskType::Inner, None, &[]),
            ],
        );
        assert!(matches!(
            job.validate(),
            Err(JobConfigError::DependencyOrder { .. })
        ));
    }

    #[test]
    fn test_tests_pairing() {
        let job = JobConfig::new(
            header(),
            vec![
                task("c", TaskType::Initiation, None, &[]),
                task("t2.exec", TaskType::Execution, Some("t2"), &["c"]),
                task("t1.exec", TaskType::Execution, Some("t1"), &["c"]),
                task("t2.judge", TaskType::Evaluation, Some("t2"), &["t2.exec"]),
                task("t1.judge", TaskType::Evaluation, Some("t1"), &["t1.exec"]),
            ],
        );
        let tests = job.tests().unwrap();
        assert_eq!(
            tests,
            vec![
                TestTasks {
                    test_id: "t2".into(),
                    execution: "t2.exec".into(),
                    evaluation: "t2.judge".into(),
                },
                TestTasks {
                    test_id: "t1".into(),
                    execution: "t1.exec".into(),
                    evaluation: "t1.judge".into(),
                },
            ]
        );
    }

    #[test]
    fn test_tests_incomplete() {
        let job = JobConfig::new(
            header(),
            vec![task("t1.exec", TaskType::Execution, Some("t1"), &[])],
        );
        assert_eq!(
            job.tests(),
            Err(JobConfigError::IncompleteTest {
                test: "t1".into(),
                missing: "evaluation",
            })
        );
    }

    #[test]
    fn test_yaml_round_trip_keeps_order() {
        let job = JobConfig::new(
            header(),
            vec![
                task("z", TaskType::Initiation, None, &[]),
                task("a", TaskType::Execution, Some("t"), &["z"]),
            ],
        );
        let yaml = job.to_yaml().unwrap();
        let parsed = JobConfig::from_yaml(&yaml).unwrap();
        let ids: Vec<_> = parsed.tasks().iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(parsed, job);
    }
}
