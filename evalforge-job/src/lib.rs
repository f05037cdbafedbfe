//! Job configuration produced by the exercise compiler and consumed by the evaluation worker.
//!
//! A job is a flat, ordered list of [`Task`]s. Every task runs a single command, optionally inside
//! a sandbox limited by some per-hardware-group [`Limits`], and can depend on other tasks of the
//! same job. The worker executes the tasks in the given order, a task whose dependencies failed is
//! skipped.
//!
//! There are three interesting kinds of tasks:
//!
//! - _initiation_ tasks prepare the evaluation (e.g. compile the submitted sources); if one of them
//!   fails no test can be scored;
//! - _execution_ tasks run the submitted program on the input of a test;
//! - _evaluation_ tasks judge the output of an execution task.
//!
//! Each test of the exercise is made of exactly one execution task and one evaluation task, the
//! pairing is recovered with [`JobConfig::tests`].
//!
//! # Example
//!
//! ```
//! use evalforge_job::{JobConfig, SubmissionHeader, Task, TaskType};
//!
//! let mut compile = Task::new(TaskType::Initiation, "/usr/bin/gcc");
//! compile.args(vec!["sol.c", "-o", "a.out"]);
//! compile.task_id = "compilation".into();
//!
//! let job = JobConfig::new(SubmissionHeader::new("42", "student"), vec![compile]);
//! assert_eq!(job.job_id(), "student_42");
//! assert!(job.task("compilation").is_some());
//! ```

mod job_config;
mod limits;
mod task;

pub use job_config::*;
pub use limits::*;
pub use task::*;
