use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use evalforge_config::ScoreConfig;

use crate::{EvaluationResults, ScoreCalculatorAccessor, ScoreError, TestResult};

/// How the score of a solution is turned into points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PointsConfig {
    /// The points of a solution with a full score.
    #[serde(default)]
    pub max_points: u32,
    /// Solutions with less points than this get no points at all.
    #[serde(default)]
    pub points_threshold: u32,
    /// Whether the solution was submitted after the deadline.
    #[serde(default)]
    pub after_deadline: bool,
}

/// The final evaluation of a solution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub job_id: String,
    /// Whether the solution was prepared successfully (e.g. it compiled).
    pub init_ok: bool,
    /// The score, between 0 and 1.
    pub score: f64,
    pub points: u32,
    pub max_points: u32,
    pub correct: bool,
    pub tests: Vec<TestResult>,
}

/// Computes the score and the points of a solution from the results of its tests.
#[derive(Debug)]
pub struct EvaluationPointsLoader<'a> {
    calculators: &'a ScoreCalculatorAccessor,
}

impl<'a> EvaluationPointsLoader<'a> {
    pub fn new(calculators: &'a ScoreCalculatorAccessor) -> EvaluationPointsLoader<'a> {
        EvaluationPointsLoader { calculators }
    }

    /// The score of the solution using the calculator of the exercise. A solution that failed its
    /// initiation has no score.
    pub fn score(
        &self,
        config: &ScoreConfig,
        init_ok: bool,
        tests: &[TestResult],
    ) -> Result<f64, ScoreError> {
        let calculator = self.calculators.calculator(&config.calculator);
        let test_ids: Vec<String> = tests.iter().map(|t| t.test_id.clone()).collect();
        calculator.validate_config(&config.config, &test_ids)?;
        if !init_ok {
            return Ok(0.0);
        }
        let scores: IndexMap<String, f64> = tests
            .iter()
            .map(|t| (t.test_id.clone(), t.score))
            .collect();
        let score = calculator.compute(&config.config, &scores)?;
        debug!("Score computed by '{}': {}", calculator.name(), score);
        Ok(score)
    }

    /// The points of a solution with the specified score.
    pub fn points(score: f64, max_points: u32, points_threshold: u32) -> u32 {
        let points = (score * max_points as f64).floor().max(0.0) as u32;
        if points < points_threshold {
            0
        } else {
            points
        }
    }

    /// Whether the solution is considered correct. Exercises without points are correct when the
    /// solution has some score and was submitted in time.
    pub fn is_correct(max_points: u32, points: u32, score: f64, after_deadline: bool) -> bool {
        if max_points > 0 {
            points > 0
        } else {
            !after_deadline && score > 0.0
        }
    }

    /// Evaluate the solution from the results of its job.
    pub fn evaluate(
        &self,
        results: &EvaluationResults,
        tests: Vec<TestResult>,
        score: &ScoreConfig,
        points: &PointsConfig,
    ) -> Result<EvaluationReport, ScoreError> {
        let value = self.score(score, results.init_ok(), &tests)?;
        let earned = Self::points(value, points.max_points, points.points_threshold);
        Ok(EvaluationReport {
            job_id: results.job_id().to_string(),
            init_ok: results.init_ok(),
            score: value,
            points: earned,
            max_points: points.max_points,
            correct: Self::is_correct(points.max_points, earned, value, points.after_deadline),
            tests,
        })
    }
}
