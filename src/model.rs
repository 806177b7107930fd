//! Core data model for bat-cycle.
//!
//! Telemetry snapshots, power status, charge modes, and the control
//! states the cycling state machine moves through.

mod power;
mod snapshot;
mod state;

pub use power::{ChargeMode, PowerStatus};
pub use snapshot::Snapshot;
pub use state::ControlState;

/// `strftime` pattern shared by log rows and default log file names.
pub const TIME_FORMAT: &str = "%Y-%m-%d_%H_%M_%S";
