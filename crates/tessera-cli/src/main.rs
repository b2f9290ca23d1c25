//! The `tessera` binary.

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

use tessera_cli::{Args, report};

fn main() -> ExitCode {
    miette::set_panic_hook();

    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(args.log_level)
        .init();
    debug!(args:?; "Parsed arguments");

    match tessera_cli::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            for problem in report::failure(&err) {
                error!("{}", report::render(&problem));
            }
            ExitCode::FAILURE
        }
    }
}
