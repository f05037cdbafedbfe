//! # evalforge
//!
//! This is both an application and a library. The binary loads the exercises, the pipelines and
//! the results from disk and drives the compiler and the results interpreter of the `evalforge-*`
//! crates; the library exposes the same tools to be used inside other applications.

#[macro_use]
extern crate log;

pub mod error;
pub mod loader;
mod opt;
pub mod tools;

pub use opt::*;
