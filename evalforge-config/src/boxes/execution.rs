use evalforge_job::dirs::EVAL_DIR;
use evalforge_job::{SandboxConfig, Task, TaskType};

use crate::boxes::{ports, working_dir, CompilationParams};
use crate::{CompilationError, PipelineBox};

/// A single execution task running the binary in the sandbox, with the standard input and output
/// bound to the files of the ports and the limits of the test.
pub(crate) fn compile(
    b: &PipelineBox,
    params: &CompilationParams,
) -> Result<Vec<Task>, CompilationError> {
    let binary = b.required_input(ports::BINARY_FILE, EVAL_DIR)?;
    let args = b.optional_input(ports::ARGS, EVAL_DIR).unwrap_or_default();

    let mut sandbox = SandboxConfig::isolate();
    sandbox.chdir(working_dir(params));
    if let Some(stdin) = b.optional_input(ports::STDIN, EVAL_DIR) {
        sandbox.stdin(stdin.concat());
    }
    if let Some(stdout) = b.optional_output(ports::STDOUT, EVAL_DIR) {
        sandbox.stdout(stdout.concat());
    }
    for limits in params.limits {
        sandbox.limits(limits.hw_group_id.clone(), limits.limits.clone());
    }

    let mut task = Task::new(TaskType::Execution, binary.concat());
    task.args(args).sandbox(sandbox);
    Ok(vec![task])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use evalforge_job::{HwGroupLimits, Limits};

    use super::*;
    use crate::{BoxKind, Variable, VariableType};

    fn exec_box() -> PipelineBox {
        let mut b = PipelineBox::new("run", BoxKind::ElfExecution);
        b.input_port_mut(ports::BINARY_FILE)
            .unwrap()
            .set_value(Variable::new("binary", VariableType::File, "a.out"))
            .unwrap();
        b
    }

    #[test]
    fn test_exec_sandbox() {
        let mut b = exec_box();
        let stdin = b.input_port_mut(ports::STDIN).unwrap();
        stdin
            .set_value(Variable::new("input", VariableType::File, "01.in"))
            .unwrap();
        stdin.set_directory("01");
        let stdout = b.output_port_mut(ports::STDOUT).unwrap();
        stdout
            .set_value(Variable::new("output", VariableType::File, "out"))
            .unwrap();
        stdout.set_directory("01");
        let mut limits = Limits::new();
        limits.time(1.0).memory(1 << 20);
        let limits = vec![HwGroupLimits {
            hw_group_id: "group1".into(),
            limits,
        }];
        let params = CompilationParams {
            test_id: Some("01"),
            directory: "01",
            limits: &limits,
        };
        let tasks = b.compile(&params).unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert!(task.is_execution());
        assert_eq!(task.cmd.bin, "${EVAL_DIR}/a.out");
        let sandbox = task.sandbox.as_ref().unwrap();
        assert_eq!(sandbox.stdin.as_deref(), Some("${EVAL_DIR}/01/01.in"));
        assert_eq!(sandbox.stdout.as_deref(), Some("${EVAL_DIR}/01/out"));
        assert_eq!(sandbox.chdir.as_deref(), Some("${EVAL_DIR}/01"));
        assert_eq!(sandbox.limits_for("group1").unwrap().time, Some(1.0));
    }

    #[test]
    fn test_exec_without_stdin() {
        let b = exec_box();
        let params = CompilationParams {
            test_id: None,
            directory: "",
            limits: &[],
        };
        let tasks = b.compile(&params).unwrap();
        let sandbox = tasks[0].sandbox.as_ref().unwrap();
        assert_eq!(sandbox.stdin, None);
        assert_eq!(sandbox.stdout, None);
        assert_eq!(sandbox.chdir.as_deref(), Some("${EVAL_DIR}"));
    }
}
