use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use evalforge_job::{JobConfig, TaskId, TestTasks};

use crate::{RawTaskResult, ResultsLoadingError, TaskResult, TestResult};

/// The payload sent back by the worker at the end of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResults {
    #[serde(rename = "job-id")]
    pub job_id: Option<String>,
    pub results: Option<Vec<RawTaskResult>>,
}

/// The results of a job, checked against the job configuration they were produced for.
///
/// Every task of the job has exactly one result, the tasks the worker did not report are
/// considered skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResults {
    job_id: String,
    results: IndexMap<TaskId, TaskResult>,
    tests: Vec<TestTasks>,
    hw_groups: Vec<String>,
    init_ok: bool,
}

impl EvaluationResults {
    /// Parse the YAML payload of the worker and interpret it against the job.
    pub fn from_yaml(yaml: &str, job: &JobConfig) -> Result<EvaluationResults, ResultsLoadingError> {
        let raw: RawResults =
            serde_yaml::from_str(yaml).map_err(|e| ResultsLoadingError::Parse(e.to_string()))?;
        EvaluationResults::from_raw(raw, job)
    }

    /// Interpret the payload of the worker against the job.
    pub fn from_raw(raw: RawResults, job: &JobConfig) -> Result<EvaluationResults, ResultsLoadingError> {
        let expected = job.job_id();
        let found = raw.job_id.ok_or(ResultsLoadingError::MissingJobId)?;
        if found != expected {
            return Err(ResultsLoadingError::JobIdMismatch { expected, found });
        }
        let raw_results = raw.results.ok_or(ResultsLoadingError::MissingResults)?;
        let tests = job
            .tests()
            .map_err(|e| ResultsLoadingError::InvalidJob(e.to_string()))?;

        let mut reported: IndexMap<TaskId, TaskResult> = IndexMap::new();
        for raw_result in raw_results {
            let result = TaskResult::from_raw(raw_result)?;
            if job.task(&result.task_id).is_none() {
                warn!(
                    "Result of task '{}' which is not part of job '{}'",
                    result.task_id, expected
                );
                continue;
            }
            reported.insert(result.task_id.clone(), result);
        }

        let mut results = IndexMap::new();
        let mut init_ok = true;
        for task in job.tasks() {
            let result = reported
                .swap_remove(&task.task_id)
                .unwrap_or_else(|| TaskResult::skipped(task.task_id.clone()));
            if task.is_initiation() && !result.is_ok() {
                debug!("Initiation task '{}' is {:?}", task.task_id, result.status);
                init_ok = false;
            }
            results.insert(task.task_id.clone(), result);
        }
        Ok(EvaluationResults {
            job_id: expected,
            results,
            tests,
            hw_groups: job.submission.hw_groups.clone(),
            init_ok,
        })
    }

    /// The full identifier of the job.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Whether all the initiation tasks were completed successfully.
    pub fn init_ok(&self) -> bool {
        self.init_ok
    }

    /// The result of a task of the job.
    pub fn task_result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    /// The results of all the tasks, in the order of the job.
    pub fn task_results(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.values()
    }

    /// The results of the tests, in the order of the job. The limits are the ones of the specified
    /// hardware group, or of the first hardware group of the job.
    pub fn test_results(&self, job: &JobConfig, hw_group: Option<&str>) -> Vec<TestResult> {
        let hw_group = hw_group.or_else(|| self.hw_groups.first().map(String::as_str));
        self.tests
            .iter()
            .map(|test| {
                let execution = self.result_of(&test.execution);
                let evaluation = self.result_of(&test.evaluation);
                let limits = hw_group.and_then(|hw_group| {
                    job.task(&test.execution)
                        .and_then(|task| task.sandbox.as_ref())
                        .and_then(|sandbox| sandbox.limits_for(hw_group))
                        .cloned()
                });
                TestResult::new(test.test_id.clone(), execution, evaluation, limits)
            })
            .collect()
    }

    fn result_of(&self, task_id: &str) -> TaskResult {
        self.results
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| TaskResult::skipped(task_id))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use speculoos::prelude::*;

    use evalforge_job::{Limits, SandboxConfig, SubmissionHeader, Task, TaskType};

    use super::*;
    use crate::{TaskStatus, TestStatus};

    fn task(id: &str, task_type: TaskType, test: Option<&str>) -> Task {
        let mut task = Task::new(task_type, "bin");
        task.task_id = id.into();
        task.test_id = test.map(String::from);
        task
    }

    fn job() -> JobConfig {
        let mut header = SubmissionHeader::new("42", "student");
        header.hw_groups = vec!["group1".into()];
        let mut exec = task("t1.exec", TaskType::Execution, Some("t1"));
        let mut limits = Limits::new();
        limits.time(1.0).memory(1 << 20);
        let mut sandbox = SandboxConfig::isolate();
        sandbox.limits("group1", limits);
        exec.sandbox(sandbox);
        JobConfig::new(
            header,
            vec![
                task("shared.compile", TaskType::Initiation, None),
                exec,
                task("t1.judge", TaskType::Evaluation, Some("t1")),
            ],
        )
    }

    #[test]
    fn test_missing_results_are_skipped() {
        let yaml = r#"
job-id: student_42
results:
  - task-id: shared.compile
    status: OK
  - task-id: t1.exec
    status: OK
    sandbox_results:
      exitcode: 0
      memory: 1024
      time: 0.1
      message: ""
      killed: false
"#;
        let results = EvaluationResults::from_yaml(yaml, &job()).unwrap();
        assert_that!(results.task_results().count()).is_equal_to(3);
        assert_eq!(
            results.task_result("t1.judge").unwrap().status,
            TaskStatus::Skipped
        );
        assert!(results.init_ok());
        let tests = results.test_results(&job(), None);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].status, TestStatus::Skipped);
        assert_eq!(tests[0].limits.as_ref().unwrap().time, Some(1.0));
    }

    #[test]
    fn test_failed_initiation() {
        let yaml = "job-id: student_42\nresults:\n  - task-id: shared.compile\n    status: FAILED\n";
        let results = EvaluationResults::from_yaml(yaml, &job()).unwrap();
        assert!(!results.init_ok());
    }

    #[test]
    fn test_unknown_task_is_ignored() {
        let yaml = "job-id: student_42\nresults:\n  - task-id: other\n    status: OK\n";
        let results = EvaluationResults::from_yaml(yaml, &job()).unwrap();
        assert!(results.task_result("other").is_none());
        assert!(!results.init_ok());
    }

    #[test]
    fn test_job_id_errors() {
        assert_eq!(
            EvaluationResults::from_yaml("results: []", &job()),
            Err(ResultsLoadingError::MissingJobId)
        );
        assert_eq!(
            EvaluationResults::from_yaml("job-id: student_43\nresults: []", &job()),
            Err(ResultsLoadingError::JobIdMismatch {
                expected: "student_42".into(),
                found: "student_43".into()
            })
        );
        assert_eq!(
            EvaluationResults::from_yaml("job-id: student_42", &job()),
            Err(ResultsLoadingError::MissingResults)
        );
    }

    #[test]
    fn test_result_errors() {
        let yaml = "job-id: student_42\nresults:\n  - status: OK\n";
        assert_eq!(
            EvaluationResults::from_yaml(yaml, &job()),
            Err(ResultsLoadingError::MissingTaskId)
        );
        let yaml = "job-id: student_42\nresults:\n  - task-id: t1.exec\n    status: WHAT\n";
        assert!(matches!(
            EvaluationResults::from_yaml(yaml, &job()),
            Err(ResultsLoadingError::UnknownStatus { .. })
        ));
    }

    #[test]
    fn test_invalid_payload() {
        assert!(matches!(
            EvaluationResults::from_yaml("[1, 2", &job()),
            Err(ResultsLoadingError::Parse(_))
        ));
    }
}
