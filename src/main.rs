use clap::Parser;

use crate::opts::{Opts, Subcommand};
use crate::prelude::*;

mod dataset;
mod infer;
mod logging;
mod math;
mod opts;
mod prelude;
mod trainer;

fn main() -> Result {
    let opts = Opts::parse();
    logging::init()?;
    match opts.subcommand {
        Subcommand::Train(opts) => trainer::run(opts),
        Subcommand::Infer(opts) => infer::run(opts),
    }
}
