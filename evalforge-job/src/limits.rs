use serde::{Deserialize, Serialize};

/// Resource limits of a sandboxed task. On some worker platforms some of the fields may not be
/// supported or may be less accurate.
///
/// ```
/// use evalforge_job::Limits;
///
/// let mut limits = Limits::new();
/// limits.time(2.0).wall_time(3.0).memory(64 * 1024 * 1024);
/// assert_eq!(limits.time, Some(2.0));
/// assert_eq!(limits.memory, Some(64 * 1024 * 1024));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Limits {
    /// Limit on the cpu time of the process, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Limit on the total time of execution, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_time: Option<f64>,
    /// Limit on the number of bytes the process can use in any moment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Limit on the number of threads/processes the process can spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<u32>,
}

impl Limits {
    /// Make an empty limits where all the limits are disabled.
    pub fn new() -> Limits {
        Limits::default()
    }

    /// Set the cpu time limit in seconds.
    pub fn time(&mut self, limit: f64) -> &mut Self {
        self.time = Some(limit);
        self
    }

    /// Set the wall time limit in seconds.
    pub fn wall_time(&mut self, limit: f64) -> &mut Self {
        self.wall_time = Some(limit);
        self
    }

    /// Set the memory limit in bytes.
    pub fn memory(&mut self, limit: u64) -> &mut Self {
        self.memory = Some(limit);
        self
    }

    /// Set the maximum number of processes/threads.
    pub fn parallel(&mut self, limit: u32) -> &mut Self {
        self.parallel = Some(limit);
        self
    }

    /// Check that the limits are meaningful: times must be positive and finite, memory must not be
    /// zero. Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("time", self.time), ("wall-time", self.wall_time)] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    return Err(format!("{} limit must be a positive number, got {}", name, value));
                }
            }
        }
        if self.memory == Some(0) {
            return Err("memory limit must not be zero".into());
        }
        if self.parallel == Some(0) {
            return Err("parallel limit must not be zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let mut limits = Limits::new();
        assert!(limits.validate().is_ok());
        limits.time(1.5).memory(1024);
        assert!(limits.validate().is_ok());
        limits.time(-1.0);
        assert!(limits.validate().unwrap_err().contains("time"));
        let mut limits = Limits::new();
        limits.memory(0);
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_deserialize_kebab() {
        let limits: Limits = serde_yaml::from_str("time: 2.5\nwall-time: 5\nmemory: 1048576").unwrap();
        assert_eq!(limits.time, Some(2.5));
        assert_eq!(limits.wall_time, Some(5.0));
        assert_eq!(limits.memory, Some(1_048_576));
        assert_eq!(limits.parallel, None);
    }
}
