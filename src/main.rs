use clap::Parser;

use evalforge::error::NiceError;
use evalforge::tools::check::main_check;
use evalforge::tools::compile::main_compile;
use evalforge::tools::evaluate::main_evaluate;
use evalforge::tools::hash::main_hash;
use evalforge::{Opt, Tool};

fn main() {
    let base_opt = Opt::parse();
    base_opt.logger.enable_log();

    match base_opt.tool {
        Tool::Compile(opt) => main_compile(opt),
        Tool::Check(opt) => main_check(opt),
        Tool::Evaluate(opt) => main_evaluate(opt),
        Tool::Hash(opt) => main_hash(opt),
    }
    .nice_unwrap()
}
