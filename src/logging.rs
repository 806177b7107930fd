//! Diagnostic logging.
//!
//! Diagnostics go to stderr through `tracing`; the test log rows go to
//! stdout and the log file, so the two never interleave in a redirected
//! capture.
//!
//! Filter priority, highest first:
//!
//! 1. `BAT_CYCLE_LOG` (directives, e.g. `bat_cycle=debug`)
//! 2. `RUST_LOG`
//! 3. `-q` → error, default → info, `-v` → debug

use std::{env, io};

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV: &str = "BAT_CYCLE_LOG";

/// Verbosity chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Install the global subscriber. Call once, first thing in `main`.
pub fn init(verbosity: Verbosity) {
    let use_ansi = io::IsTerminal::is_terminal(&io::stderr());

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(use_ansi)
        .with_target(false);

    let registry = tracing_subscriber::registry().with(filter(verbosity));
    if verbosity == Verbosity::Verbose {
        registry.with(layer).init();
    } else {
        registry.with(layer.compact()).init();
    }
}

fn filter(verbosity: Verbosity) -> EnvFilter {
    // An unparseable BAT_CYCLE_LOG falls through rather than failing the run.
    if let Ok(directives) = env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    EnvFilter::new(verbosity.level().as_str())
}
