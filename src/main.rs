use clap::Parser;
use log::{debug, warn};
use snafu::ErrorCompat;

mod args;
mod dash;

use crate::args::{Args, Command};
use crate::dash::DashResult;

fn init_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
}

fn run(args: &Args) -> DashResult<()> {
    match &args.command {
        Command::Analyze(a) => dash::run_analyze(a),
        Command::Submit(a) => dash::run_submit(a),
        Command::History(a) => dash::run_history(a),
        Command::Schema(a) => dash::run_schema(a),
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(source) = std::error::Error::source(&e) {
            eprintln!("caused by: {}", source);
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
