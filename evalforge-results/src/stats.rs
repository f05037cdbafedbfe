use serde::{Deserialize, Serialize};

use evalforge_job::Limits;

use crate::ResultsLoadingError;

/// The resources used by a sandboxed task, as measured by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Exit code of the process.
    pub exitcode: i64,
    /// Peak memory usage, in bytes.
    pub memory: u64,
    /// Cpu time used, in seconds.
    pub time: f64,
    /// Message of the sandbox, usually the reason the process was killed.
    pub message: String,
    /// Whether the process was killed by the sandbox.
    pub killed: bool,
}

/// The statistics as sent by the worker, any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStats {
    pub exitcode: Option<i64>,
    pub memory: Option<u64>,
    pub time: Option<f64>,
    pub message: Option<String>,
    pub killed: Option<bool>,
}

impl Stats {
    /// Check that all the fields of the raw statistics of a task are present.
    pub fn from_raw(task: &str, raw: RawStats) -> Result<Stats, ResultsLoadingError> {
        let missing = |field| ResultsLoadingError::MissingStats {
            task: task.to_string(),
            field,
        };
        Ok(Stats {
            exitcode: raw.exitcode.ok_or_else(|| missing("exitcode"))?,
            memory: raw.memory.ok_or_else(|| missing("memory"))?,
            time: raw.time.ok_or_else(|| missing("time"))?,
            message: raw.message.ok_or_else(|| missing("message"))?,
            killed: raw.killed.ok_or_else(|| missing("killed"))?,
        })
    }

    /// Whether the cpu time is within the limit, a missing limit is always respected.
    pub fn is_time_ok(&self, limits: &Limits) -> bool {
        limits.time.map_or(true, |limit| self.time <= limit)
    }

    /// Whether the memory is within the limit, a missing limit is always respected.
    pub fn is_memory_ok(&self, limits: &Limits) -> bool {
        limits.memory.map_or(true, |limit| self.memory <= limit)
    }

    pub fn meets_limits(&self, limits: &Limits) -> bool {
        self.is_time_ok(limits) && self.is_memory_ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn raw() -> RawStats {
        RawStats {
            exitcode: Some(0),
            memory: Some(2048),
            time: Some(0.5),
            message: Some("".into()),
            killed: Some(false),
        }
    }

    #[test]
    fn test_missing_field() {
        let mut stats = raw();
        stats.killed = None;
        assert_eq!(
            Stats::from_raw("t", stats),
            Err(ResultsLoadingError::MissingStats {
                task: "t".into(),
                field: "killed"
            })
        );
    }

    #[test]
    fn test_limits() {
        let stats = Stats::from_raw("t", raw()).unwrap();
        let mut limits = Limits::new();
        assert!(stats.meets_limits(&limits));
        limits.time(0.5).memory(2048);
        assert!(stats.meets_limits(&limits));
        limits.time(0.4);
        assert!(!stats.is_time_ok(&limits));
        assert!(stats.is_memory_ok(&limits));
        limits.time(1.0).memory(1024);
        assert!(!stats.meets_limits(&limits));
    }
}
