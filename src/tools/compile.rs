use std::path::PathBuf;

use anyhow::{Context, Error};
use clap::Parser;

use evalforge_compiler::Compiler;
use evalforge_job::SubmissionHeader;

use crate::loader::{load_exercise, load_pipelines, write_output};
use crate::ExerciseOpt;

#[derive(Parser, Debug, Clone)]
pub struct CompileOpt {
    #[clap(flatten)]
    pub exercise: ExerciseOpt,

    /// The runtime environment of the submission
    #[clap(short = 'E', long)]
    pub environment: String,

    /// Name of a submitted file, can be repeated
    #[clap(short, long = "file")]
    pub files: Vec<String>,

    /// Identifier of the submission
    #[clap(long, default_value = "0")]
    pub job_id: String,

    /// Type of the submission
    #[clap(long, default_value = "student")]
    pub job_type: String,

    /// Hardware group the job can run on, can be repeated. Defaults to all the hardware groups of
    /// the exercise
    #[clap(long = "hw-group")]
    pub hw_groups: Vec<String>,

    /// Where to write the job configuration, defaults to stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

pub fn main_compile(opt: CompileOpt) -> Result<(), Error> {
    let exercise = load_exercise(&opt.exercise.exercise)?;
    let pipelines = load_pipelines(&opt.exercise.pipelines)?;

    let mut header = SubmissionHeader::new(opt.job_id, opt.job_type);
    header.hw_groups = opt.hw_groups;
    let job = Compiler::new(&pipelines)
        .compile(&exercise, &opt.environment, &opt.files, header)
        .with_context(|| {
            format!(
                "Failed to compile the exercise for environment '{}'",
                opt.environment
            )
        })?;
    info!("Compiled job '{}' with {} tasks", job.job_id(), job.tasks().len());
    let yaml = job.to_yaml().context("Failed to serialize the job")?;
    write_output(opt.output.as_ref(), &yaml)
}
