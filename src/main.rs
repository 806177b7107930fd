mod cli;
mod config;
mod control;
mod cycle;
mod event_log;
mod logging;
mod model;
mod pacer;
mod telemetry;

use std::process;

use clap::Parser;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbosity());

    if let Err(e) = cli::run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
