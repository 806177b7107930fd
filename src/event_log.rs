//! Append-only test log.
//!
//! One header line, then one row per tick:
//!
//! ```text
//! Time                 Cycle  RSOC  current_now  voltage_now  charge_full
//! 2019-08-01_13_45_00      1   100     -1523000     12564000      3842000
//! ```
//!
//! The file is opened in append mode for every write and synced before the
//! call returns, so an interrupted run keeps every row it produced. Each
//! line is mirrored to stdout.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::model::Snapshot;

/// Writes the test log and echoes it to the console.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
    echo: bool,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: true,
        }
    }

    /// A log that writes the file only.
    #[cfg(test)]
    pub fn quiet(path: impl Into<PathBuf>) -> Self {
        Self {
            echo: false,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the column header, creating the file if needed.
    pub fn init_header(&self) -> io::Result<()> {
        self.write_line(&header())
    }

    /// Append one row for `snapshot`, taken during `cycle`.
    pub fn append(&self, cycle: u32, snapshot: &Snapshot) -> io::Result<()> {
        self.write_line(&row(cycle, snapshot))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        if self.echo {
            println!("{line}");
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        file.sync_data()
    }
}

fn header() -> String {
    format!(
        "{:<19}  {:>5}  {:>4}  {:>11}  {:>11}  {:>11}",
        "Time", "Cycle", "RSOC", "current_now", "voltage_now", "charge_full"
    )
}

fn row(cycle: u32, s: &Snapshot) -> String {
    format!(
        "{:<19}  {:>5}  {:>4}  {:>11}  {:>11}  {:>11}",
        s.timestamp(),
        cycle,
        s.state_of_charge,
        s.current_now,
        s.voltage_now,
        s.charge_full
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;
    use jiff::tz::TimeZone;
    use tempfile::TempDir;

    fn sample_snapshot(soc: u8) -> Snapshot {
        Snapshot {
            taken_at: date(2019, 8, 1)
                .at(13, 45, 0, 0)
                .to_zoned(TimeZone::UTC)
                .unwrap(),
            state_of_charge: soc,
            current_now: -1_523_000,
            voltage_now: 12_564_000,
            charge_full: 3_842_000,
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn header_names_columns_in_order() {
        let columns: Vec<String> = header().split_whitespace().map(String::from).collect();
        assert_eq!(
            columns,
            [
                "Time",
                "Cycle",
                "RSOC",
                "current_now",
                "voltage_now",
                "charge_full"
            ]
        );
    }

    #[test]
    fn row_fields_follow_header() {
        let line = row(3, &sample_snapshot(42));
        let fields: Vec<&str> = line.split_whitespace().collect();

        assert_eq!(
            fields,
            [
                "2019-08-01_13_45_00",
                "3",
                "42",
                "-1523000",
                "12564000",
                "3842000"
            ]
        );
    }

    #[test]
    fn creates_file_and_appends_rows() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::quiet(dir.path().join("run.txt"));

        log.init_header().unwrap();
        log.append(1, &sample_snapshot(100)).unwrap();
        log.append(1, &sample_snapshot(99)).unwrap();

        let lines = read_lines(log.path());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Time"));
        assert!(lines[2].contains("  99  "));
    }

    #[test]
    fn never_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        fs::write(&path, "earlier run\n").unwrap();

        let log = EventLog::quiet(&path);
        log.init_header().unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0], "earlier run");
        assert!(lines[1].starts_with("Time"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::quiet(dir.path().join("absent").join("run.txt"));

        assert!(log.init_header().is_err());
    }
}
