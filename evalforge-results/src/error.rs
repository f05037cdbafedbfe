use thiserror::Error;

/// The results sent back by the worker cannot be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResultsLoadingError {
    /// The payload is not valid YAML, or has the wrong structure.
    #[error("invalid results: {0}")]
    Parse(String),
    /// The payload does not say which job it belongs to.
    #[error("the results do not include the job id")]
    MissingJobId,
    /// The payload belongs to another job.
    #[error("the results belong to job '{found}' instead of '{expected}'")]
    JobIdMismatch {
        /// The identifier of the job being evaluated.
        expected: String,
        /// The identifier found in the results.
        found: String,
    },
    /// The payload has no list of results.
    #[error("the results do not include the list of task results")]
    MissingResults,
    /// A result has no task identifier.
    #[error("a task result does not include the required 'task-id' field")]
    MissingTaskId,
    /// A result has no status.
    #[error("the result of task '{0}' does not include the required 'status' field")]
    MissingStatus(String),
    /// A result has a status that is not known.
    #[error("the result of task '{task}' has the unknown status '{status}'")]
    UnknownStatus {
        /// The task with the bad status.
        task: String,
        /// The status itself.
        status: String,
    },
    /// The sandbox statistics of a task lack a field.
    #[error("the sandbox results of task '{task}' do not include the '{field}' field")]
    MissingStats {
        /// The task with the incomplete statistics.
        task: String,
        /// The missing field.
        field: &'static str,
    },
    /// The job the results are interpreted against is not valid.
    #[error("invalid job configuration: {0}")]
    InvalidJob(String),
}

/// The score of a solution cannot be computed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScoreError {
    /// No score calculator was registered.
    #[error("no score calculator is available")]
    NoCalculators,
    /// The configuration of the calculator is not valid.
    #[error("invalid configuration of the '{calculator}' score calculator: {reason}")]
    InvalidConfig {
        /// The name of the calculator.
        calculator: &'static str,
        /// What is wrong with the configuration.
        reason: String,
    },
}
