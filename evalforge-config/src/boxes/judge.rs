use evalforge_job::dirs::{EVAL_DIR, JUDGES_DIR};
use evalforge_job::{SandboxConfig, Task, TaskType};

use crate::boxes::{ports, working_dir, CompilationParams};
use crate::{join_path, CompilationError, PipelineBox};

/// The judge used when the box does not select one.
pub const DEFAULT_JUDGE: &str = "recodex-judge-normal";

/// A single evaluation task: `<judge> <expected> <actual> <args...>`. The judge prints the score
/// on its standard output, so the output of the sandbox is sent back.
pub(crate) fn compile(
    b: &PipelineBox,
    params: &CompilationParams,
) -> Result<Vec<Task>, CompilationError> {
    let expected = b.required_input(ports::EXPECTED_OUTPUT, EVAL_DIR)?;
    let actual = b.required_input(ports::ACTUAL_OUTPUT, EVAL_DIR)?;
    let args = b.optional_input(ports::ARGS, EVAL_DIR).unwrap_or_default();
    let judge = b
        .optional_input(ports::JUDGE_TYPE, EVAL_DIR)
        .map(|v| v.concat())
        .unwrap_or_else(|| DEFAULT_JUDGE.to_string());

    let mut sandbox = SandboxConfig::isolate();
    sandbox.chdir(working_dir(params)).output(true);

    let mut task = Task::new(TaskType::Evaluation, join_path(JUDGES_DIR, &judge));
    task.args(expected.into_iter().chain(actual).chain(args))
        .sandbox(sandbox);
    Ok(vec![task])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{BoxKind, Variable, VariableType};

    fn judge_box() -> PipelineBox {
        let mut b = PipelineBox::new("judge", BoxKind::Judge);
        for (port, name) in [
            (ports::EXPECTED_OUTPUT, "01.out"),
            (ports::ACTUAL_OUTPUT, "out"),
        ] {
            let port = b.input_port_mut(port).unwrap();
            port.set_value(Variable::new(name, VariableType::File, name))
                .unwrap();
            port.set_directory("01");
        }
        b
    }

    fn params() -> CompilationParams<'static> {
        CompilationParams {
            test_id: Some("01"),
            directory: "01",
            limits: &[],
        }
    }

    #[test]
    fn test_default_judge() {
        let tasks = judge_box().compile(&params()).unwrap();
        let task = &tasks[0];
        assert!(task.is_evaluation());
        assert_eq!(task.cmd.bin, "${JUDGES_DIR}/recodex-judge-normal");
        assert_eq!(
            task.cmd.args,
            vec!["${EVAL_DIR}/01/01.out", "${EVAL_DIR}/01/out"]
        );
        assert!(task.sandbox.as_ref().unwrap().output);
    }

    #[test]
    fn test_selected_judge() {
        let mut b = judge_box();
        b.input_port_mut(ports::JUDGE_TYPE)
            .unwrap()
            .set_value(Variable::new(
                "judge",
                VariableType::String,
                "recodex-judge-shuffle",
            ))
            .unwrap();
        let tasks = b.compile(&params()).unwrap();
        assert_eq!(tasks[0].cmd.bin, "${JUDGES_DIR}/recodex-judge-shuffle");
    }
}
