//! Power-supply status and the charge modes the EC can be forced into.

use std::{convert::Infallible, fmt, str::FromStr};

/// Charging status as reported by the power-supply `status` attribute.
///
/// Parsing is case-insensitive and never fails: anything unrecognized
/// is kept verbatim (lower-cased) in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerStatus {
    Charging,
    Discharging,
    NotCharging,
    Full,
    Unknown(String),
}

impl PowerStatus {
    /// True when the battery is draining, i.e. AC is not supplying the system.
    pub fn is_discharging(&self) -> bool {
        matches!(self, Self::Discharging)
    }
}

impl FromStr for PowerStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = s.trim().to_lowercase();
        Ok(match status.as_str() {
            "charging" => Self::Charging,
            "discharging" => Self::Discharging,
            "not charging" => Self::NotCharging,
            "full" => Self::Full,
            _ => Self::Unknown(status),
        })
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Charging => f.write_str("charging"),
            Self::Discharging => f.write_str("discharging"),
            Self::NotCharging => f.write_str("not charging"),
            Self::Full => f.write_str("full"),
            Self::Unknown(other) => f.write_str(other),
        }
    }
}

/// Mode the embedded controller can be told to hold the battery in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeMode {
    /// Run from the battery even with AC connected.
    Discharge,

    /// Let the charger behave normally.
    Normal,
}

impl ChargeMode {
    /// The `chargecontrol` verb for this mode.
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Discharge => "discharge",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for ChargeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}
