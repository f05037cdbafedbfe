//! Interpretation of the results of an evaluation job.
//!
//! The worker reports the outcome of every task of a [`JobConfig`](evalforge_job::JobConfig). The
//! results are checked against the job ([`EvaluationResults`]), paired into the results of the
//! tests ([`TestResult`]) and finally aggregated into the score and the points of the solution by
//! an [`EvaluationPointsLoader`] with one of the registered [`ScoreCalculator`]s.

#[macro_use]
extern crate log;

mod error;
mod evaluation_results;
mod points;
mod score_calculators;
mod stats;
mod task_result;
mod test_result;

pub use error::*;
pub use evaluation_results::*;
pub use points::*;
pub use score_calculators::*;
pub use stats::*;
pub use task_result::*;
pub use test_result::*;
