use anyhow::{bail, Context, Error};
use clap::Parser;

use evalforge_compiler::ExerciseChecker;
use evalforge_results::ScoreCalculatorAccessor;

use crate::error::print_diagnostics;
use crate::loader::{load_exercise, load_pipelines};
use crate::ExerciseOpt;

#[derive(Parser, Debug, Clone)]
pub struct CheckOpt {
    #[clap(flatten)]
    pub exercise: ExerciseOpt,

    /// Print the diagnostics in JSON to stdout
    #[clap(long)]
    pub json: bool,
}

pub fn main_check(opt: CheckOpt) -> Result<(), Error> {
    let exercise = load_exercise(&opt.exercise.exercise)?;
    let pipelines = load_pipelines(&opt.exercise.pipelines)?;
    let calculators = ScoreCalculatorAccessor::default();
    let diagnostics = ExerciseChecker::new(&pipelines, &calculators).check(&exercise);

    if opt.json {
        let json =
            serde_json::to_string(&diagnostics).context("Non-serializable diagnostics")?;
        println!("{}", json);
    } else {
        print_diagnostics(&diagnostics);
    }
    if diagnostics.has_errors() {
        bail!(
            "The exercise has {} errors",
            diagnostics.errors().count()
        );
    }
    Ok(())
}
