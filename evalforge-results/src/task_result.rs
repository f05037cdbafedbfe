use serde::{Deserialize, Serialize};

use evalforge_job::TaskId;

use crate::{RawStats, ResultsLoadingError, Stats};

/// The outcome of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "SKIPPED")]
    Skipped,
}

impl TaskStatus {
    pub fn from_str(task: &str, status: &str) -> Result<TaskStatus, ResultsLoadingError> {
        match status {
            "OK" => Ok(TaskStatus::Ok),
            "FAILED" => Ok(TaskStatus::Failed),
            "SKIPPED" => Ok(TaskStatus::Skipped),
            _ => Err(ResultsLoadingError::UnknownStatus {
                task: task.to_string(),
                status: status.to_string(),
            }),
        }
    }
}

/// The output of a task, as sent by the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutput {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

/// The result of a task, as sent by the worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTaskResult {
    #[serde(rename = "task-id")]
    pub task_id: Option<String>,
    pub status: Option<String>,
    pub output: Option<RawOutput>,
    pub sandbox_results: Option<RawStats>,
}

/// The result of a task of the job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// The standard output, if sent back by the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// The standard error, if sent back by the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// The statistics of the sandbox, only for sandboxed tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl TaskResult {
    /// The result of a task the worker did not report.
    pub fn skipped<S: Into<TaskId>>(task_id: S) -> TaskResult {
        TaskResult {
            task_id: task_id.into(),
            status: TaskStatus::Skipped,
            stdout: None,
            stderr: None,
            stats: None,
        }
    }

    /// Check and convert the result sent by the worker.
    pub fn from_raw(raw: RawTaskResult) -> Result<TaskResult, ResultsLoadingError> {
        let task_id = raw.task_id.ok_or(ResultsLoadingError::MissingTaskId)?;
        let status = raw
            .status
            .ok_or_else(|| ResultsLoadingError::MissingStatus(task_id.clone()))?;
        let status = TaskStatus::from_str(&task_id, &status)?;
        let stats = raw
            .sandbox_results
            .map(|stats| Stats::from_raw(&task_id, stats))
            .transpose()?;
        let output = raw.output.unwrap_or_default();
        Ok(TaskResult {
            task_id,
            status,
            stdout: output.stdout,
            stderr: output.stderr,
            stats,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == TaskStatus::Ok
    }

    pub fn is_skipped(&self) -> bool {
        self.status == TaskStatus::Skipped
    }

    pub fn has_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }

    /// The standard output and the standard error, separated by a newline when both are present.
    pub fn output(&self) -> String {
        match (&self.stdout, &self.stderr) {
            (Some(out), Some(err)) => format!("{}\n{}", out, err),
            (Some(out), None) => out.clone(),
            (None, Some(err)) => err.clone(),
            (None, None) => String::new(),
        }
    }

    /// The score of the task: 1 if it succeeded, 0 otherwise.
    pub fn score(&self) -> f64 {
        if self.is_ok() {
            1.0
        } else {
            0.0
        }
    }

    /// The score printed by a judge: the first token of its standard output when it is a number
    /// between 0 and 1, otherwise the score of the task.
    pub fn judge_score(&self) -> f64 {
        if !self.is_ok() {
            return 0.0;
        }
        self.stdout
            .as_deref()
            .and_then(|out| out.split_whitespace().next())
            .and_then(|token| token.parse::<f64>().ok())
            .filter(|score| (0.0..=1.0).contains(score))
            .unwrap_or_else(|| self.score())
    }
}
