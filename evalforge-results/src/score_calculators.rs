use indexmap::IndexMap;
use serde_yaml::Value;

use crate::ScoreError;

/// The key of the weights in the configuration of the weighted calculator.
const TEST_WEIGHTS: &str = "testWeights";
/// The weight of a test in an empty weighted configuration.
const DEFAULT_WEIGHT: f64 = 100.0;

/// A strategy to aggregate the scores of the tests into the score of the solution.
pub trait ScoreCalculator: std::fmt::Debug + Send + Sync {
    /// The name the calculator is selected with.
    fn name(&self) -> &'static str;

    /// Check that the configuration is valid for an exercise with the specified tests.
    fn validate_config(&self, config: &Value, tests: &[String]) -> Result<(), ScoreError>;

    /// Aggregate the scores of the tests, each between 0 and 1, into a score between 0 and 1.
    fn compute(&self, config: &Value, scores: &IndexMap<String, f64>) -> Result<f64, ScoreError>;
}

/// The mean of the scores of the tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformScoreCalculator;

/// The weighted mean of the scores of the tests.
///
/// The configuration maps every test to its weight:
///
/// ```yaml
/// testWeights:
///   "01": 100
///   "02": 200
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedScoreCalculator;

/// The minimum of the scores of the tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllOrNothingScoreCalculator;

impl ScoreCalculator for UniformScoreCalculator {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn validate_config(&self, _config: &Value, _tests: &[String]) -> Result<(), ScoreError> {
        Ok(())
    }

    fn compute(&self, _config: &Value, scores: &IndexMap<String, f64>) -> Result<f64, ScoreError> {
        if scores.is_empty() {
            return Ok(0.0);
        }
        Ok(scores.values().sum::<f64>() / scores.len() as f64)
    }
}

impl WeightedScoreCalculator {
    fn invalid<S: Into<String>>(&self, reason: S) -> ScoreError {
        ScoreError::InvalidConfig {
            calculator: self.name(),
            reason: reason.into(),
        }
    }

    /// Extract the weight of every test. An empty configuration gives the same weight to all the
    /// tests.
    fn weights<'a, I>(&self, config: &Value, tests: I) -> Result<Vec<(String, f64)>, ScoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let weights = match config {
            Value::Null => None,
            Value::Mapping(map) if map.is_empty() => None,
            Value::Mapping(map) => match map.get(TEST_WEIGHTS) {
                Some(Value::Mapping(weights)) => Some(weights),
                Some(_) => return Err(self.invalid(format!("'{}' is not a mapping", TEST_WEIGHTS))),
                None => return Err(self.invalid(format!("missing '{}'", TEST_WEIGHTS))),
            },
            _ => return Err(self.invalid("the configuration is not a mapping")),
        };
        let Some(weights) = weights else {
            return Ok(tests
                .into_iter()
                .map(|test| (test.to_string(), DEFAULT_WEIGHT))
                .collect());
        };
        tests
            .into_iter()
            .map(|test| {
                let weight = weights
                    .get(test)
                    .ok_or_else(|| self.invalid(format!("missing weight of test '{}'", test)))?;
                let weight = weight
                    .as_f64()
                    .filter(|w| w.is_finite() && *w >= 0.0)
                    .ok_or_else(|| {
                        self.invalid(format!("the weight of test '{}' is not a valid number", test))
                    })?;
                Ok((test.to_string(), weight))
            })
            .collect()
    }
}

impl ScoreCalculator for WeightedScoreCalculator {
    fn name(&self) -> &'static str {
        "weighted"
    }

    fn validate_config(&self, config: &Value, tests: &[String]) -> Result<(), ScoreError> {
        self.weights(config, tests.iter().map(String::as_str))
            .map(|_| ())
    }

    fn compute(&self, config: &Value, scores: &IndexMap<String, f64>) -> Result<f64, ScoreError> {
        let weights = self.weights(config, scores.keys().map(String::as_str))?;
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total == 0.0 {
            return Ok(0.0);
        }
        let weighted: f64 = weights.iter().map(|(test, w)| scores[test] * w).sum();
        Ok(weighted / total)
    }
}

impl ScoreCalculator for AllOrNothingScoreCalculator {
    fn name(&self) -> &'static str {
        "all-or-nothing"
    }

    fn validate_config(&self, _config: &Value, _tests: &[String]) -> Result<(), ScoreError> {
        Ok(())
    }

    fn compute(&self, _config: &Value, scores: &IndexMap<String, f64>) -> Result<f64, ScoreError> {
        Ok(scores.values().copied().reduce(f64::min).unwrap_or(0.0))
    }
}

/// The registry of the available score calculators.
#[derive(Debug)]
pub struct ScoreCalculatorAccessor {
    calculators: Vec<Box<dyn ScoreCalculator>>,
}

impl ScoreCalculatorAccessor {
    /// Build a registry from the calculators, the first one is the default.
    pub fn new(calculators: Vec<Box<dyn ScoreCalculator>>) -> Result<Self, ScoreError> {
        if calculators.is_empty() {
            return Err(ScoreError::NoCalculators);
        }
        Ok(ScoreCalculatorAccessor { calculators })
    }

    /// The calculator with the specified name. An empty or unknown name selects the default
    /// calculator.
    pub fn calculator(&self, name: &str) -> &dyn ScoreCalculator {
        if let Some(calc) = self.calculators.iter().find(|c| c.name() == name) {
            return calc.as_ref();
        }
        if !name.is_empty() {
            warn!("Unknown score calculator '{}', using the default one", name);
        }
        self.calculators[0].as_ref()
    }

    /// The names of the registered calculators.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.calculators.iter().map(|c| c.name())
    }
}

impl Default for ScoreCalculatorAccessor {
    fn default() -> Self {
        ScoreCalculatorAccessor {
            calculators: vec![
                Box::new(UniformScoreCalculator),
                Box::new(WeightedScoreCalculator),
                Box::new(AllOrNothingScoreCalculator),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    fn scores(values: &[(&str, f64)]) -> IndexMap<String, f64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_uniform() {
        let calc = UniformScoreCalculator;
        let s = scores(&[("a", 1.0), ("b", 0.5), ("c", 0.0)]);
        assert_abs_diff_eq!(calc.compute(&Value::Null, &s).unwrap(), 0.5);
        assert_abs_diff_eq!(calc.compute(&Value::Null, &IndexMap::new()).unwrap(), 0.0);
    }

    #[test]
    fn test_weighted() {
        let calc = WeightedScoreCalculator;
        let config = yaml("testWeights:\n  a: 300\n  b: 100\n");
        let s = scores(&[("a", 1.0), ("b", 0.0)]);
        assert_abs_diff_eq!(calc.compute(&config, &s).unwrap(), 0.75);
        assert_abs_diff_eq!(calc.compute(&Value::Null, &s).unwrap(), 0.5);
    }

    #[test]
    fn test_weighted_zero_weights() {
        let calc = WeightedScoreCalculator;
        let config = yaml("testWeights:\n  a: 0\n");
        assert_abs_diff_eq!(calc.compute(&config, &scores(&[("a", 1.0)])).unwrap(), 0.0);
    }

    #[test]
    fn test_weighted_missing_test() {
        let calc = WeightedScoreCalculator;
        let config = yaml("testWeights:\n  a: 1\n");
        let err = calc
            .validate_config(&config, &["a".into(), "b".into()])
            .unwrap_err();
        assert!(err.to_string().contains("'b'"));
        assert!(calc.validate_config(&config, &["a".into()]).is_ok());
        assert!(calc.validate_config(&Value::Null, &["a".into()]).is_ok());
        assert!(calc.validate_config(&yaml("[1]"), &[]).is_err());
    }

    #[test]
    fn test_all_or_nothing() {
        let calc = AllOrNothingScoreCalculator;
        let s = scores(&[("a", 1.0), ("b", 0.25)]);
        assert_abs_diff_eq!(calc.compute(&Value::Null, &s).unwrap(), 0.25);
    }

    #[test]
    fn test_accessor() {
        let accessor = ScoreCalculatorAccessor::default();
        assert_eq!(accessor.calculator("weighted").name(), "weighted");
        assert_eq!(accessor.calculator("").name(), "uniform");
        assert_eq!(accessor.calculator("unknown").name(), "uniform");
        assert_eq!(
            accessor.names().collect::<Vec<_>>(),
            vec!["uniform", "weighted", "all-or-nothing"]
        );
        assert_eq!(
            ScoreCalculatorAccessor::new(vec![]).unwrap_err(),
            ScoreError::NoCalculators
        );
    }
}
