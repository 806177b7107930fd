//! Telemetry snapshot: one sample of the battery.

use jiff::Zoned;

use super::TIME_FORMAT;

/// One sample of battery telemetry, taken fresh every tick.
///
/// Units follow the power-supply class: µA, µV, µAh.
/// A negative `current_now` means the battery is discharging.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub taken_at: Zoned,
    pub state_of_charge: u8,
    pub current_now: i64,
    pub voltage_now: u64,
    pub charge_full: u64,
}

impl Snapshot {
    /// Local time of the sample, formatted for a log row.
    pub fn timestamp(&self) -> String {
        self.taken_at.strftime(TIME_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;
    use jiff::tz::TimeZone;

    #[test]
    fn timestamp_uses_underscored_time() {
        let taken_at = date(2019, 5, 14)
            .at(9, 3, 7, 0)
            .to_zoned(TimeZone::UTC)
            .unwrap();
        let snapshot = Snapshot {
            taken_at,
            state_of_charge: 80,
            current_now: -1_250_000,
            voltage_now: 12_100_000,
            charge_full: 4_000_000,
        };

        assert_eq!(snapshot.timestamp(), "2019-05-14_09_03_07");
    }
}
