//! The tools of the command line, one per subcommand.

pub mod check;
pub mod compile;
pub mod evaluate;
pub mod hash;
