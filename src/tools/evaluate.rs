use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::Parser;

use evalforge_config::ScoreConfig;
use evalforge_results::{
    EvaluationPointsLoader, EvaluationResults, PointsConfig, ScoreCalculatorAccessor,
};

use crate::loader::{load_exercise, load_job, write_output};

#[derive(Parser, Debug, Clone)]
pub struct EvaluateOpt {
    /// Path of the job configuration the results were produced for
    #[clap(short, long)]
    pub job: PathBuf,

    /// Path of the results sent back by the worker
    #[clap(short, long)]
    pub results: PathBuf,

    /// Path of the configuration of the exercise, for its score calculator
    #[clap(short, long)]
    pub exercise: Option<PathBuf>,

    /// The hardware group the job was executed on, defaults to the first one of the job
    #[clap(long)]
    pub hw_group: Option<String>,

    /// The points of a solution with a full score
    #[clap(long, default_value = "0")]
    pub max_points: u32,

    /// Solutions with less points than this get no points at all
    #[clap(long, default_value = "0")]
    pub points_threshold: u32,

    /// The solution was submitted after the deadline
    #[clap(long)]
    pub after_deadline: bool,

    /// Where to write the JSON report, defaults to stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

pub fn main_evaluate(opt: EvaluateOpt) -> Result<(), Error> {
    let job = load_job(&opt.job)?;
    let content = std::fs::read_to_string(&opt.results)
        .with_context(|| format!("Failed to read results from {}", opt.results.display()))?;
    let results = EvaluationResults::from_yaml(&content, &job)
        .with_context(|| format!("Invalid results at {}", opt.results.display()))?;
    let score = match &opt.exercise {
        Some(path) => load_exercise(path)?.score,
        None => ScoreConfig::default(),
    };
    let points = PointsConfig {
        max_points: opt.max_points,
        points_threshold: opt.points_threshold,
        after_deadline: opt.after_deadline,
    };

    let tests = results.test_results(&job, opt.hw_group.as_deref());
    let calculators = ScoreCalculatorAccessor::default();
    let report = EvaluationPointsLoader::new(&calculators)
        .evaluate(&results, tests, &score, &points)
        .context("Failed to compute the score")?;
    info!(
        "Solution of job '{}' scored {} ({} points)",
        report.job_id, report.score, report.points
    );
    let json = serde_json::to_string_pretty(&report).context("Non-serializable report")?;
    write_output(opt.output.as_ref(), &(json + "\n"))
}
