//! Compiler of the pipeline based configurations of the exercises.
//!
//! An exercise describes, for every test and runtime environment, the ordered list of
//! [`Pipeline`](evalforge_config::Pipeline)s evaluating a submission. The [`Compiler`] turns that
//! description into the flat [`JobConfig`](evalforge_job::JobConfig) executed by the worker:
//!
//! 1. [`PipelinesMerger`] links the pipelines of every test into a [`MergeTree`];
//! 2. [`VariablesResolver`] gives a value to every port of the trees;
//! 3. [`BoxesSorter`] orders the boxes of every tree;
//! 4. [`BoxesOptimizer`] merges the boxes repeated in many tests;
//! 5. [`TestDirectoriesResolver`] assigns the working directories;
//! 6. [`BoxesCompiler`] lowers the boxes into tasks.
//!
//! The [`ExerciseChecker`] runs the same compilation on a fake submission to find the problems of
//! an exercise before a student does.

#[macro_use]
extern crate log;

mod boxes_compiler;
mod checker;
mod compiler;
mod directories;
mod merger;
mod optimizer;
mod resolver;
mod sorter;

pub use boxes_compiler::*;
pub use checker::*;
pub use compiler::*;
pub use directories::*;
pub use merger::*;
pub use optimizer::*;
pub use resolver::*;
pub use sorter::*;
