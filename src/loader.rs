//! Loading of the configuration files from disk.

use std::path::Path;

use anyhow::{bail, Context, Error};
use indexmap::IndexMap;

use evalforge_config::{Exercise, Pipeline};
use evalforge_job::JobConfig;

/// The extensions of the pipeline files inside a directory.
const PIPELINE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Load the configuration of an exercise.
pub fn load_exercise<P: AsRef<Path>>(path: P) -> Result<Exercise, Error> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read exercise from {}", path.display()))?;
    Exercise::from_yaml(&content)
        .with_context(|| format!("Invalid exercise configuration at {}", path.display()))
}

/// Load all the pipelines inside a directory, indexed by their identifier. The files are read in
/// alphabetical order.
pub fn load_pipelines<P: AsRef<Path>>(dir: P) -> Result<IndexMap<String, Pipeline>, Error> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("Pipelines directory {} does not exist", dir.display());
    }
    let mut paths = vec![];
    for ext in PIPELINE_EXTENSIONS {
        let pattern = dir.join(format!("*.{}", ext));
        for path in glob::glob(&pattern.to_string_lossy()).context("Invalid glob pattern")? {
            paths.push(path.context("Failed to list the pipelines")?);
        }
    }
    paths.sort();

    let mut pipelines = IndexMap::new();
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read pipeline from {}", path.display()))?;
        let pipeline = Pipeline::from_yaml(&content)
            .with_context(|| format!("Invalid pipeline at {}", path.display()))?;
        debug!("Loaded pipeline '{}' from {}", pipeline.id, path.display());
        if let Some(previous) = pipelines.insert(pipeline.id.clone(), pipeline) {
            bail!(
                "Pipeline '{}' is defined more than once (last at {})",
                previous.id,
                path.display()
            );
        }
    }
    info!("Loaded {} pipelines from {}", pipelines.len(), dir.display());
    Ok(pipelines)
}

/// Load a job configuration, as produced by the `compile` tool.
pub fn load_job<P: AsRef<Path>>(path: P) -> Result<JobConfig, Error> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job from {}", path.display()))?;
    JobConfig::from_yaml(&content)
        .with_context(|| format!("Invalid job configuration at {}", path.display()))
}

/// Write the content to the file, or to stdout if no file is specified.
pub fn write_output<P: AsRef<Path>>(path: Option<P>, content: &str) -> Result<(), Error> {
    match path {
        Some(path) => {
            let path = path.as_ref();
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
