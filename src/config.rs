//! Run configuration.
//!
//! Settings come in three layers, highest first: command-line flags, an
//! optional `config.toml`, built-in defaults. The layers are merged once at
//! startup into an immutable [`TestPlan`].

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use jiff::Zoned;
use serde::Deserialize;

use crate::model::TIME_FORMAT;

pub const DEFAULT_SUPPLY: &str = "/sys/class/power_supply/sbs-12-000b";
pub const DEFAULT_LOG_DIR: &str = "/usr/local";
pub const DEFAULT_ECTOOL: &str = "ectool";

const DEFAULT_CYCLES: u32 = 20;
const DEFAULT_DELAY_SECS: u64 = 60;
const DEFAULT_HIGH: u8 = 100;
const DEFAULT_LOW: u8 = 5;
const DEFAULT_DISCHARGE_SETTLE_SECS: u64 = 1;
const DEFAULT_CHARGE_SETTLE_SECS: u64 = 10;

const LOG_PREFIX: &str = "bat_rel_test_";
const LOG_SUFFIX: &str = ".txt";

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "BAT_CYCLE_CONFIG";

/// Errors from turning settings into a plan.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("{name} boundary {value} is outside 0-100")]
    OutOfRange { name: &'static str, value: u8 },

    #[error("low boundary {low} must be below high boundary {high}")]
    Inverted { low: u8, high: u8 },
}

/// State-of-charge thresholds. Always `low < high <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    high: u8,
    low: u8,
}

impl Boundaries {
    pub fn new(high: u8, low: u8) -> Result<Self, PlanError> {
        if high > 100 {
            return Err(PlanError::OutOfRange {
                name: "high",
                value: high,
            });
        }
        if low > 100 {
            return Err(PlanError::OutOfRange {
                name: "low",
                value: low,
            });
        }
        if low >= high {
            return Err(PlanError::Inverted { low, high });
        }
        Ok(Self { high, low })
    }

    pub fn high(self) -> u8 {
        self.high
    }

    pub fn low(self) -> u8 {
        self.low
    }
}

/// Pauses after each charge-mode command before readings are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub discharge: Duration,
    pub charge: Duration,
}

/// Everything the state machine needs for one run. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct TestPlan {
    pub bounds: Boundaries,
    pub iterations: u32,
    pub delay: Duration,
    pub settle: SettleDelays,
    pub log_path: PathBuf,
}

/// One layer of settings. Every key is optional so layers can be stacked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Power-supply directory to read telemetry from.
    pub supply: Option<PathBuf>,

    /// Directory the log file is created in.
    pub log_dir: Option<PathBuf>,

    /// Base name of the log file, without directory or `.txt`.
    pub log_name: Option<String>,

    /// Program used to drive charge control.
    pub ectool: Option<String>,

    pub cycles: Option<u32>,
    pub delay_secs: Option<u64>,
    pub high: Option<u8>,
    pub low: Option<u8>,
    pub discharge_settle_secs: Option<u64>,
    pub charge_settle_secs: Option<u64>,
}

impl Config {
    /// Load the config file.
    ///
    /// An explicitly named file (argument or `BAT_CYCLE_CONFIG`) must exist.
    /// The default file is optional: when it is missing, every setting
    /// falls back to its default.
    pub fn load(explicit: Option<&Path>) -> Result<Self, String> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let (path, required) = match named {
            Some(path) => (path, true),
            None => match Self::path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The default config file path: `<config dir>/bat-cycle/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("bat-cycle").join("config.toml"))
    }

    /// Fill every unset key from `base`.
    #[must_use]
    pub fn or(self, base: Self) -> Self {
        Self {
            supply: self.supply.or(base.supply),
            log_dir: self.log_dir.or(base.log_dir),
            log_name: self.log_name.or(base.log_name),
            ectool: self.ectool.or(base.ectool),
            cycles: self.cycles.or(base.cycles),
            delay_secs: self.delay_secs.or(base.delay_secs),
            high: self.high.or(base.high),
            low: self.low.or(base.low),
            discharge_settle_secs: self.discharge_settle_secs.or(base.discharge_settle_secs),
            charge_settle_secs: self.charge_settle_secs.or(base.charge_settle_secs),
        }
    }

    pub fn supply(&self) -> PathBuf {
        self.supply
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SUPPLY))
    }

    pub fn ectool(&self) -> &str {
        self.ectool.as_deref().unwrap_or(DEFAULT_ECTOOL)
    }

    /// Build the immutable plan for a run starting at `started`.
    ///
    /// `started` names the default log file.
    pub fn plan(&self, started: &Zoned) -> Result<TestPlan, PlanError> {
        let bounds = Boundaries::new(
            self.high.unwrap_or(DEFAULT_HIGH),
            self.low.unwrap_or(DEFAULT_LOW),
        )?;

        let log_dir = self
            .log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
        let log_name = match &self.log_name {
            Some(name) => format!("{name}{LOG_SUFFIX}"),
            None => format!("{LOG_PREFIX}{}{LOG_SUFFIX}", started.strftime(TIME_FORMAT)),
        };

        Ok(TestPlan {
            bounds,
            iterations: self.cycles.unwrap_or(DEFAULT_CYCLES),
            delay: Duration::from_secs(self.delay_secs.unwrap_or(DEFAULT_DELAY_SECS)),
            settle: SettleDelays {
                discharge: Duration::from_secs(
                    self.discharge_settle_secs
                        .unwrap_or(DEFAULT_DISCHARGE_SETTLE_SECS),
                ),
                charge: Duration::from_secs(
                    self.charge_settle_secs.unwrap_or(DEFAULT_CHARGE_SETTLE_SECS),
                ),
            },
            log_path: log_dir.join(log_name),
        })
    }
}
