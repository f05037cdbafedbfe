use serde::{Deserialize, Serialize};

use crate::Limits;

/// The identifier of a task, it's unique inside a single job configuration.
pub type TaskId = String;

/// Name of the sandbox used for all the sandboxed tasks.
pub const ISOLATE_SANDBOX: &str = "isolate";

/// Commands that are not executed inside a sandbox but are implemented directly by the worker.
pub mod commands {
    /// Download a file from the file server: `fetch <hash> <destination>`.
    pub const FETCH: &str = "fetch";
    /// Create a directory: `mkdir <path>`.
    pub const MKDIR: &str = "mkdir";
}

/// Placeholders expanded by the worker with the real paths of its working directories.
pub mod dirs {
    /// Directory where the submitted and fetched files are placed, outside the sandbox.
    pub const SOURCE_DIR: &str = "${SOURCE_DIR}";
    /// The same directory as seen from inside the sandbox.
    pub const EVAL_DIR: &str = "${EVAL_DIR}";
    /// Directory where the judges are installed on the worker.
    pub const JUDGES_DIR: &str = "${JUDGES_DIR}";
}

/// The role of a [`Task`](struct.Task.html) inside a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// A task preparing the evaluation, its failure makes the whole solution fail.
    Initiation,
    /// A task running the submitted program on a test.
    Execution,
    /// A task judging the output of an execution task.
    Evaluation,
    /// An auxiliary task whose result is not interpreted.
    #[default]
    Inner,
}

/// The command line of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskCommand {
    /// Path of the executable, or the name of an internal worker command.
    pub bin: String,
    /// The command line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// The limits of a sandboxed task for a single hardware group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HwGroupLimits {
    /// Identifier of the hardware group these limits apply to.
    #[serde(rename = "hw-group-id")]
    pub hw_group_id: String,
    /// The actual limits.
    #[serde(flatten)]
    pub limits: Limits,
}

/// Configuration of the sandbox a task is executed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SandboxConfig {
    /// Name of the sandbox implementation.
    pub name: String,
    /// File bound to the standard input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    /// File the standard output is written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    /// Working directory of the process, inside the sandbox.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chdir: Option<String>,
    /// Whether the worker should report the (truncated) output of the process.
    #[serde(default)]
    pub output: bool,
    /// Limits of the process, one entry per hardware group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<HwGroupLimits>,
}

/// A single command executed by the worker.
///
/// Tasks are created by the lowering of the pipeline boxes, then the compiler assigns them the
/// identifier, the dependencies and the owning test. Once inside a
/// [`JobConfig`](struct.JobConfig.html) they are not modified anymore.
///
/// ```
/// use evalforge_job::{SandboxConfig, Task, TaskType};
///
/// let mut task = Task::new(TaskType::Execution, "${EVAL_DIR}/a.out");
/// task.args(vec!["--fast"]).sandbox(SandboxConfig::isolate());
/// assert_eq!(task.cmd.args, vec!["--fast".to_string()]);
/// assert!(task.is_execution());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Task {
    /// The identifier of the task.
    pub task_id: TaskId,
    /// Priority of the task, higher values are executed first among independent tasks.
    pub priority: u32,
    /// Whether the failure of this task should stop the whole job.
    pub fatal_failure: bool,
    /// The tasks that must be completed successfully before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
    /// What to execute.
    pub cmd: TaskCommand,
    /// The role of this task.
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    /// The test this task belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// The sandbox of the task, internal worker commands are not sandboxed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxConfig>,
}

impl SandboxConfig {
    /// Make a new sandbox configuration with the specified sandbox name and nothing bound.
    pub fn new<S: Into<String>>(name: S) -> SandboxConfig {
        SandboxConfig {
            name: name.into(),
            stdin: None,
            stdout: None,
            chdir: None,
            output: false,
            limits: vec![],
        }
    }

    /// The default sandbox of the worker.
    pub fn isolate() -> SandboxConfig {
        SandboxConfig::new(ISOLATE_SANDBOX)
    }

    /// Bind the standard input to the specified file.
    pub fn stdin<S: Into<String>>(&mut self, path: S) -> &mut Self {
        self.stdin = Some(path.into());
        self
    }

    /// Redirect the standard output to the specified file.
    pub fn stdout<S: Into<String>>(&mut self, path: S) -> &mut Self {
        self.stdout = Some(path.into());
        self
    }

    /// Set the working directory inside the sandbox.
    pub fn chdir<S: Into<String>>(&mut self, path: S) -> &mut Self {
        self.chdir = Some(path.into());
        self
    }

    /// Ask the worker to send back the output of the process.
    pub fn output(&mut self, output: bool) -> &mut Self {
        self.output = output;
        self
    }

    /// Add the limits for a hardware group, replacing the previous ones of the same group.
    pub fn limits<S: Into<String>>(&mut self, hw_group_id: S, limits: Limits) -> &mut Self {
        let hw_group_id = hw_group_id.into();
        self.limits.retain(|l| l.hw_group_id != hw_group_id);
        self.limits.push(HwGroupLimits {
            hw_group_id,
            limits,
        });
        self
    }

    /// The limits for the specified hardware group, if any.
    pub fn limits_for(&self, hw_group_id: &str) -> Option<&Limits> {
        self.limits
            .iter()
            .find(|l| l.hw_group_id == hw_group_id)
            .map(|l| &l.limits)
    }
}

impl Task {
    /// Create a new task without identifier and dependencies, running the specified binary.
    pub fn new<S: Into<String>>(task_type: TaskType, bin: S) -> Task {
        Task {
            task_id: TaskId::new(),
            priority: 1,
            fatal_failure: task_type == TaskType::Initiation,
            dependencies: vec![],
            cmd: TaskCommand {
                bin: bin.into(),
                args: vec![],
            },
            task_type,
            test_id: None,
            sandbox: None,
        }
    }

    /// Sets the command line arguments of the task. Calling again this method will overwrite the
    /// previous values.
    pub fn args<S: Into<String>, I: IntoIterator<Item = S>>(&mut self, args: I) -> &mut Self {
        self.cmd.args = args.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Run this task inside the specified sandbox.
    pub fn sandbox(&mut self, sandbox: SandboxConfig) -> &mut Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// Add a dependency on another task, duplicates are ignored.
    pub fn depends_on<S: Into<TaskId>>(&mut self, task: S) -> &mut Self {
        let task = task.into();
        if !self.dependencies.contains(&task) {
            self.dependencies.push(task);
        }
        self
    }

    /// Whether this is an initiation task.
    pub fn is_initiation(&self) -> bool {
        self.task_type == TaskType::Initiation
    }

    /// Whether this is an execution task.
    pub fn is_execution(&self) -> bool {
        self.task_type == TaskType::Execution
    }

    /// Whether this is an evaluation task.
    pub fn is_evaluation(&self) -> bool {
        self.task_type == TaskType::Evaluation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiation_is_fatal() {
        let task = Task::new(TaskType::Initiation, "/usr/bin/gcc");
        assert!(task.fatal_failure);
        let task = Task::new(TaskType::Execution, "a.out");
        assert!(!task.fatal_failure);
    }

    #[test]
    fn test_depends_on_dedup() {
        let mut task = Task::new(TaskType::Inner, "cp");
        task.depends_on("a").depends_on("b").depends_on("a");
        assert_eq!(task.dependencies, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_sandbox_limits_replace() {
        let mut sandbox = SandboxConfig::isolate();
        let mut first = Limits::new();
        first.time(1.0);
        let mut second = Limits::new();
        second.time(2.0);
        sandbox.limits("group1", first).limits("group1", second);
        assert_eq!(sandbox.limits.len(), 1);
        assert_eq!(sandbox.limits_for("group1").unwrap().time, Some(2.0));
        assert!(sandbox.limits_for("group2").is_none());
    }

    #[test]
    fn test_task_type_serialization() {
        let task = Task::new(TaskType::Evaluation, "judge");
        let yaml = serde_yaml::to_string(&task).unwrap();
        assert!(yaml.contains("type: evaluation"));
        assert!(!yaml.contains("sandbox"));
    }
}
