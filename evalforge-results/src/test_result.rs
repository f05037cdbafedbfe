use serde::Serialize;

use evalforge_job::Limits;

use crate::{Stats, TaskResult, TaskStatus};

/// The outcome of a test, derived from the status of its execution and evaluation tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// Both tasks were completed successfully.
    Ok,
    /// At least one task was not executed, and none failed.
    Skipped,
    /// At least one task failed.
    Failed,
}

impl TestStatus {
    /// Classify a test from the results of its two tasks.
    pub fn from_tasks(execution: &TaskResult, evaluation: &TaskResult) -> TestStatus {
        let statuses = [execution.status, evaluation.status];
        if statuses.iter().all(|s| *s == TaskStatus::Ok) {
            TestStatus::Ok
        } else if statuses.contains(&TaskStatus::Failed) {
            TestStatus::Failed
        } else {
            TestStatus::Skipped
        }
    }
}

/// The result of a single test of the solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub test_id: String,
    pub status: TestStatus,
    /// The result of the task running the solution.
    pub execution: TaskResult,
    /// The result of the task judging the output.
    pub evaluation: TaskResult,
    /// The limits the execution was subject to, in the evaluated hardware group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Limits>,
    /// Whether the resources used by the execution respect the limits.
    pub limits_ok: bool,
    /// The score of the test, between 0 and 1.
    pub score: f64,
}

impl TestResult {
    /// Build the result of a test, computing its status and its score.
    pub fn new<S: Into<String>>(
        test_id: S,
        execution: TaskResult,
        evaluation: TaskResult,
        limits: Option<Limits>,
    ) -> TestResult {
        let status = TestStatus::from_tasks(&execution, &evaluation);
        let limits_ok = match (&execution.stats, &limits) {
            (Some(stats), Some(limits)) => stats.meets_limits(limits),
            _ => true,
        };
        let score = if status == TestStatus::Ok && limits_ok {
            evaluation.judge_score()
        } else {
            0.0
        };
        TestResult {
            test_id: test_id.into(),
            status,
            execution,
            evaluation,
            limits,
            limits_ok,
            score,
        }
    }

    /// The statistics of the execution, if reported.
    pub fn stats(&self) -> Option<&Stats> {
        self.execution.stats.as_ref()
    }

    pub fn is_time_ok(&self) -> bool {
        match (self.stats(), &self.limits) {
            (Some(stats), Some(limits)) => stats.is_time_ok(limits),
            _ => true,
        }
    }

    pub fn is_memory_ok(&self) -> bool {
        match (self.stats(), &self.limits) {
            (Some(stats), Some(limits)) => stats.is_memory_ok(limits),
            _ => true,
        }
    }

    /// The exit code of the execution, if reported.
    pub fn exit_code(&self) -> Option<i64> {
        self.stats().map(|s| s.exitcode)
    }

    /// The message of the judge, the output of its evaluation task.
    pub fn judge_output(&self) -> String {
        self.evaluation.output()
    }
}
