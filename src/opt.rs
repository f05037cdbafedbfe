use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::tools::check::CheckOpt;
use crate::tools::compile::CompileOpt;
use crate::tools::evaluate::EvaluateOpt;
use crate::tools::hash::HashOpt;

#[derive(Parser, Debug)]
#[clap(
    name = "evalforge",
    version = include_str!(concat!(env!("OUT_DIR"), "/version.txt")),
    about = "Compile exercise configurations into evaluation jobs and interpret their results"
)]
pub struct Opt {
    #[clap(flatten, next_help_heading = Some("LOGGING"))]
    pub logger: LoggerOpt,

    /// Which tool to use
    #[clap(subcommand)]
    pub tool: Tool,
}

#[derive(Subcommand, Debug)]
pub enum Tool {
    /// Compile an exercise into the job evaluating a submission
    Compile(CompileOpt),
    /// Check that an exercise can be compiled and scored
    Check(CheckOpt),
    /// Interpret the results of a job and compute the score of the solution
    Evaluate(EvaluateOpt),
    /// Compute the hashes of the remote files of an exercise
    Hash(HashOpt),
}

#[derive(Parser, Debug, Clone)]
pub struct LoggerOpt {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Where the exercise and its pipelines are read from.
#[derive(Parser, Debug, Clone)]
pub struct ExerciseOpt {
    /// Path of the configuration file of the exercise
    #[clap(short, long)]
    pub exercise: PathBuf,

    /// Directory with the pipelines, one YAML file per pipeline
    #[clap(short, long)]
    pub pipelines: PathBuf,
}

impl LoggerOpt {
    pub fn enable_log(&self) {
        if self.verbose > 0 {
            std::env::set_var("RUST_BACKTRACE", "1");
            match self.verbose {
                0 => unreachable!(),
                1 => std::env::set_var("RUST_LOG", "info"),
                2 => std::env::set_var("RUST_LOG", "debug"),
                _ => std::env::set_var("RUST_LOG", "trace"),
            }
        }

        env_logger::Builder::from_default_env()
            .format_timestamp_nanos()
            .init();
        better_panic::install();
    }
}
