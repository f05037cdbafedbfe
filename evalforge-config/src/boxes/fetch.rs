use evalforge_job::commands::FETCH;
use evalforge_job::dirs::SOURCE_DIR;
use evalforge_job::{Task, TaskType};

use crate::boxes::{ports, CompilationParams};
use crate::{CompilationError, InvariantViolation, PipelineBox};

/// One `fetch <hash> <destination>` task per file. The hashes come from the remote port, the
/// destinations from the names of the output port.
pub(crate) fn compile(
    b: &PipelineBox,
    _params: &CompilationParams,
) -> Result<Vec<Task>, CompilationError> {
    let hashes = b.required_input(ports::REMOTE, SOURCE_DIR)?;
    let destinations = b.required_output(ports::INPUT, SOURCE_DIR)?;
    if hashes.len() != destinations.len() {
        return Err(InvariantViolation(format!(
            "box '{}' fetches {} remote files into {} local files",
            b.name,
            hashes.len(),
            destinations.len()
        ))
        .into());
    }
    Ok(hashes
        .into_iter()
        .zip(destinations)
        .map(|(hash, destination)| {
            let mut task = Task::new(TaskType::Initiation, FETCH);
            task.args(vec![hash, destination]);
            task
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{BoxKind, Variable, VariableType};

    fn params() -> CompilationParams<'static> {
        CompilationParams {
            test_id: Some("01"),
            directory: "01",
            limits: &[],
        }
    }

    #[test]
    fn test_fetch_files() {
        let mut b = PipelineBox::new("fetch", BoxKind::FetchFiles);
        b.input_port_mut(ports::REMOTE)
            .unwrap()
            .set_value(Variable::new(
                "inputs",
                VariableType::RemoteFileArray,
                vec!["h1", "h2"],
            ))
            .unwrap();
        let out = b.output_port_mut(ports::INPUT).unwrap();
        out.set_value(Variable::new(
            "inputs",
            VariableType::FileArray,
            vec!["a.txt", "b.txt"],
        ))
        .unwrap();
        out.set_directory("01");
        let tasks = b.compile(&params()).unwrap();
        let commands: Vec<_> = tasks
            .iter()
            .map(|t| (t.cmd.bin.as_str(), t.cmd.args.clone()))
            .collect();
        assert_eq!(
            commands,
            vec![
                ("fetch", vec!["h1".to_string(), "${SOURCE_DIR}/01/a.txt".to_string()]),
                ("fetch", vec!["h2".to_string(), "${SOURCE_DIR}/01/b.txt".to_string()]),
            ]
        );
    }

    #[test]
    fn test_fetch_files_count_mismatch() {
        let mut b = PipelineBox::new("fetch", BoxKind::FetchFiles);
        b.input_port_mut(ports::REMOTE)
            .unwrap()
            .set_value(Variable::new(
                "inputs",
                VariableType::RemoteFileArray,
                vec!["h1", "h2"],
            ))
            .unwrap();
        b.output_port_mut(ports::INPUT)
            .unwrap()
            .set_value(Variable::new(
                "inputs",
                VariableType::FileArray,
                vec!["a.txt"],
            ))
            .unwrap();
        let err = b.compile(&params()).unwrap_err();
        assert!(!err.is_config());
    }
}
