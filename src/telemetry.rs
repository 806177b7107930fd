//! Battery telemetry.
//!
//! [`TelemetrySource`] is the narrow read interface the state machine uses.
//! [`SysfsBattery`] implements it over a power-supply class directory:
//!
//! ```text
//! /sys/class/power_supply/<name>/
//!   status        # Charging | Discharging | Not charging | Full | Unknown
//!   capacity      # state of charge, percent
//!   current_now   # µA, negative while discharging on some drivers
//!   voltage_now   # µV
//!   charge_full   # µAh
//! ```
//!
//! Every call is a fresh read; nothing is cached.

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use jiff::Zoned;

use crate::model::{PowerStatus, Snapshot};

/// Telemetry could not be read or made no sense.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed value {value:?} in {}", path.display())]
    Malformed { path: PathBuf, value: String },

    #[error("state of charge {value} in {} is outside 0-100", path.display())]
    OutOfRange { path: PathBuf, value: i64 },
}

pub type Result<T> = core::result::Result<T, TelemetryError>;

/// Read access to live battery metrics.
pub trait TelemetrySource {
    /// State of charge in percent, 0 to 100.
    fn state_of_charge(&mut self) -> Result<u8>;

    fn current_now(&mut self) -> Result<i64>;

    fn voltage_now(&mut self) -> Result<u64>;

    fn charge_full(&mut self) -> Result<u64>;

    fn power_status(&mut self) -> Result<PowerStatus>;

    /// Take one reading of each logged metric.
    fn snapshot(&mut self) -> Result<Snapshot> {
        Ok(Snapshot {
            taken_at: Zoned::now(),
            state_of_charge: self.state_of_charge()?,
            current_now: self.current_now()?,
            voltage_now: self.voltage_now()?,
            charge_full: self.charge_full()?,
        })
    }
}

/// A battery exposed through the Linux power-supply class.
#[derive(Debug, Clone)]
pub struct SysfsBattery {
    root: PathBuf,
}

impl SysfsBattery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the first line of an attribute, trimmed.
    fn read_attr(&self, name: &str) -> Result<(PathBuf, String)> {
        let path = self.root.join(name);
        let contents = fs::read_to_string(&path).map_err(|source| TelemetryError::Read {
            path: path.clone(),
            source,
        })?;
        let value = contents.lines().next().unwrap_or_default().trim().to_string();
        Ok((path, value))
    }

    fn read_number<T: FromStr>(&self, name: &str) -> Result<T> {
        let (path, value) = self.read_attr(name)?;
        value
            .parse()
            .map_err(|_| TelemetryError::Malformed { path, value })
    }
}

impl TelemetrySource for SysfsBattery {
    fn state_of_charge(&mut self) -> Result<u8> {
        let value: i64 = self.read_number("capacity")?;
        u8::try_from(value)
            .ok()
            .filter(|soc| *soc <= 100)
            .ok_or_else(|| TelemetryError::OutOfRange {
                path: self.root.join("capacity"),
                value,
            })
    }

    fn current_now(&mut self) -> Result<i64> {
        self.read_number("current_now")
    }

    fn voltage_now(&mut self) -> Result<u64> {
        self.read_number("voltage_now")
    }

    fn charge_full(&mut self) -> Result<u64> {
        self.read_number("charge_full")
    }

    fn power_status(&mut self) -> Result<PowerStatus> {
        let (_, value) = self.read_attr("status")?;
        let Ok(status) = value.parse::<PowerStatus>();
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    /// Create a power-supply directory with plausible attribute files.
    fn setup_supply() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("status"), "Charging\n").unwrap();
        fs::write(root.join("capacity"), "87\n").unwrap();
        fs::write(root.join("current_now"), "-1523000\n").unwrap();
        fs::write(root.join("voltage_now"), "12564000\n").unwrap();
        fs::write(root.join("charge_full"), "3842000\n").unwrap();
        dir
    }

    #[test]
    fn reads_each_attribute() {
        let dir = setup_supply();
        let mut battery = SysfsBattery::new(dir.path());

        assert_eq!(battery.power_status().unwrap(), PowerStatus::Charging);
        assert_eq!(battery.state_of_charge().unwrap(), 87);
        assert_eq!(battery.current_now().unwrap(), -1_523_000);
        assert_eq!(battery.voltage_now().unwrap(), 12_564_000);
        assert_eq!(battery.charge_full().unwrap(), 3_842_000);
    }

    #[test]
    fn snapshot_collects_logged_metrics() {
        let dir = setup_supply();
        let snapshot = SysfsBattery::new(dir.path()).snapshot().unwrap();

        assert_eq!(snapshot.state_of_charge, 87);
        assert_eq!(snapshot.current_now, -1_523_000);
        assert_eq!(snapshot.voltage_now, 12_564_000);
        assert_eq!(snapshot.charge_full, 3_842_000);
    }

    #[test]
    fn status_is_lower_cased() {
        let dir = setup_supply();
        fs::write(dir.path().join("status"), "DISCHARGING\n").unwrap();

        let status = SysfsBattery::new(dir.path()).power_status().unwrap();
        assert!(status.is_discharging());
    }

    #[test]
    fn missing_attribute_is_a_read_error() {
        let dir = setup_supply();
        fs::remove_file(dir.path().join("voltage_now")).unwrap();

        let err = SysfsBattery::new(dir.path()).voltage_now().unwrap_err();
        assert!(matches!(err, TelemetryError::Read { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = setup_supply();
        fs::write(dir.path().join("current_now"), "n/a\n").unwrap();

        let err = SysfsBattery::new(dir.path()).current_now().unwrap_err();
        match err {
            TelemetryError::Malformed { value, .. } => assert_eq!(value, "n/a"),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn capacity_over_100_is_rejected() {
        let dir = setup_supply();
        fs::write(dir.path().join("capacity"), "104\n").unwrap();

        let err = SysfsBattery::new(dir.path()).state_of_charge().unwrap_err();
        assert!(matches!(err, TelemetryError::OutOfRange { value: 104, .. }));
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let dir = setup_supply();
        fs::write(dir.path().join("capacity"), "-1\n").unwrap();

        let err = SysfsBattery::new(dir.path()).state_of_charge().unwrap_err();
        assert!(matches!(err, TelemetryError::OutOfRange { value: -1, .. }));
    }
}
