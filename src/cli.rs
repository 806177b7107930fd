//! CLI interface for bat-cycle.
//!
//! One command, no subcommands: parse flags, merge them over the config
//! file, check the environment, and run the cycle test to completion or
//! interrupt.

use std::path::PathBuf;

use clap::Parser;
use jiff::Zoned;
use tracing::{info, warn};

use crate::{
    config::Config,
    control::EcTool,
    cycle::{CycleRunner, RunOutcome},
    event_log::EventLog,
    logging::Verbosity,
    pacer::SignalPacer,
    telemetry::SysfsBattery,
};

/// Cycle a battery between two state-of-charge boundaries for reliability testing.
#[derive(Debug, Parser)]
#[command(name = "bat-cycle", version, after_long_help = USAGE_HELP)]
pub struct Cli {
    /// Charge/discharge cycles to run [default: 20].
    #[arg(long = "cycle", value_name = "INT")]
    pub cycles: Option<u32>,

    /// Seconds between samples [default: 60].
    #[arg(long, value_name = "SECS")]
    pub delay: Option<u64>,

    /// Log file base name; `.txt` is appended
    /// [default: bat_rel_test_<start time>].
    #[arg(long, value_name = "NAME")]
    pub file: Option<String>,

    /// High state-of-charge boundary in percent [default: 100].
    #[arg(long, value_name = "PCT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub max: Option<u8>,

    /// Low state-of-charge boundary in percent [default: 5].
    #[arg(long, value_name = "PCT", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min: Option<u8>,

    /// Config file [default: $BAT_CYCLE_CONFIG, then <config dir>/bat-cycle/config.toml].
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Power-supply directory to read telemetry from.
    #[arg(long, value_name = "DIR")]
    pub supply: Option<PathBuf>,

    /// Directory the log file is written to [default: /usr/local].
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Charge-control program [default: ectool].
    #[arg(long, value_name = "PROGRAM")]
    pub ectool: Option<String>,

    /// Debug-level diagnostics.
    #[arg(short, long)]
    pub verbose: bool,

    /// Errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

const USAGE_HELP: &str = r"Examples:
  bat-cycle                              20 cycles between 5% and 100%, one sample a minute
  bat-cycle --cycle 3 --max 80 --min 20  3 cycles between 20% and 80%
  bat-cycle --file unit-7 --delay 30     log to /usr/local/unit-7.txt every 30 seconds

AC must be connected before starting. Ctrl-C (or SIGTERM) stops the run and restores
normal charging before exit.";

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// The settings given on the command line, as the top config layer.
    pub fn overrides(&self) -> Config {
        Config {
            supply: self.supply.clone(),
            log_dir: self.log_dir.clone(),
            log_name: self.file.clone(),
            ectool: self.ectool.clone(),
            cycles: self.cycles,
            delay_secs: self.delay,
            high: self.max,
            low: self.min,
            ..Config::default()
        }
    }
}

/// Run the test, returning an error message on failure.
pub fn run(cli: &Cli) -> Result<(), String> {
    let config = cli.overrides().or(Config::load(cli.config.as_deref())?);
    let started = Zoned::now();
    let plan = config
        .plan(&started)
        .map_err(|e| format!("invalid boundaries: {e}"))?;

    let ectool = EcTool::new(config.ectool());
    verify_environment(&ectool);

    let battery = SysfsBattery::new(config.supply());
    info!(
        supply = %battery.root().display(),
        log = %plan.log_path.display(),
        "battery cycle test configured"
    );

    let pacer =
        SignalPacer::register().map_err(|e| format!("failed to install signal handlers: {e}"))?;

    let mut runner = CycleRunner::new(&plan, battery, ectool, pacer, EventLog::new(&plan.log_path));
    match runner.run().map_err(|e| e.to_string())? {
        RunOutcome::Completed { cycles } => {
            eprintln!(
                "Completed {cycles} cycle(s), log at {}",
                plan.log_path.display()
            );
        }
        RunOutcome::Interrupted { cycle, state } => {
            eprintln!("Interrupted in cycle {cycle} ({state}), charge control set to normal");
        }
    }

    Ok(())
}

/// Report the EC firmware version. A missing version does not stop the run.
fn verify_environment(ectool: &EcTool) {
    match ectool.version() {
        Ok(version) => {
            eprintln!("Current EC version: {version}");
        }
        Err(e) => warn!(error = %e, "could not read EC version"),
    }
}
