use evalforge_job::dirs::EVAL_DIR;
use evalforge_job::{SandboxConfig, Task, TaskType};

use crate::boxes::ports;
use crate::{CompilationError, PipelineBox};

/// Path of the C compiler on the workers.
pub const GCC_BINARY: &str = "/usr/bin/gcc";
/// Path of the C++ compiler on the workers.
pub const GPP_BINARY: &str = "/usr/bin/g++";

/// A single initiation task: `<compiler> <sources...> <args...> -o <binary>`.
pub(crate) fn compile(b: &PipelineBox, compiler: &str) -> Result<Vec<Task>, CompilationError> {
    let sources = b.required_input(ports::SOURCE_FILES, EVAL_DIR)?;
    let binary = b.required_output(ports::BINARY_FILE, EVAL_DIR)?;
    let args = b.optional_input(ports::ARGS, EVAL_DIR).unwrap_or_default();

    let mut task = Task::new(TaskType::Initiation, compiler);
    task.args(
        sources
            .into_iter()
            .chain(args)
            .chain(std::iter::once("-o".to_string()))
            .chain(binary),
    );
    let mut sandbox = SandboxConfig::isolate();
    sandbox.output(true);
    task.sandbox(sandbox);
    Ok(vec![task])
}
