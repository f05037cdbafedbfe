//! The model of the exercise configuration: typed variables, the boxes and their ports, the
//! pipelines the boxes are organized in and the exercises binding the pipelines to their tests.
//!
//! This crate also contains the lowering of every kind of box into the tasks of an
//! [`evalforge_job::JobConfig`], the rest of the compilation lives in `evalforge-compiler`.

#[macro_use]
extern crate log;

mod boxes;
mod error;
mod exercise;
mod pipeline;
mod port;
mod variable;
mod variables_table;

pub use boxes::*;
pub use error::*;
pub use exercise::*;
pub use pipeline::*;
pub use port::*;
pub use variable::*;
pub use variables_table::*;
