//! Control states of the cycling state machine.
//!
//! Exactly one state is active per tick. Evaluating states (`Init`,
//! `Discharging`, `Charging`) test the sampled state of charge against a
//! boundary; transition states issue a charge-mode command and always
//! advance.

use std::fmt;

use crate::config::Boundaries;

use super::ChargeMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// Wait for the battery to reach the high boundary before the first discharge.
    Init,

    /// Force discharge, then settle.
    TransitionToDischarge,

    /// Drain until the low boundary.
    Discharging,

    /// Restore normal charging, then settle.
    TransitionToCharge,

    /// Charge until the high boundary. Leaving this state completes a cycle.
    Charging,
}

/// Where one tick leaves the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: ControlState,

    /// Set only when `Charging` reaches the high boundary.
    pub cycle_complete: bool,
}

impl Step {
    fn to(next: ControlState) -> Self {
        Self {
            next,
            cycle_complete: false,
        }
    }
}

impl ControlState {
    /// The command issued when this state runs, if any.
    pub fn command(self) -> Option<ChargeMode> {
        match self {
            Self::TransitionToDischarge => Some(ChargeMode::Discharge),
            Self::TransitionToCharge => Some(ChargeMode::Normal),
            Self::Init | Self::Discharging | Self::Charging => None,
        }
    }

    /// Apply the exit condition for this state.
    ///
    /// `soc` is ignored by transition states, which always advance.
    /// After a completed cycle the machine re-enters the discharge leg
    /// through `TransitionToDischarge` so the discharge command is issued
    /// again for the next cycle.
    pub fn step(self, soc: u8, bounds: Boundaries) -> Step {
        match self {
            Self::Init if soc >= bounds.high() => Step::to(Self::TransitionToDischarge),
            Self::Init => Step::to(Self::Init),
            Self::TransitionToDischarge => Step::to(Self::Discharging),
            Self::Discharging if soc <= bounds.low() => Step::to(Self::TransitionToCharge),
            Self::Discharging => Step::to(Self::Discharging),
            Self::TransitionToCharge => Step::to(Self::Charging),
            Self::Charging if soc >= bounds.high() => Step {
                next: Self::TransitionToDischarge,
                cycle_complete: true,
            },
            Self::Charging => Step::to(Self::Charging),
        }
    }

    /// Name used in log lines and the interrupt summary.
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::TransitionToDischarge => "trans_discharge",
            Self::Discharging => "discharge",
            Self::TransitionToCharge => "trans_charge",
            Self::Charging => "charge",
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::ControlState::{Charging, Discharging, Init, TransitionToCharge, TransitionToDischarge};

    fn bounds() -> Boundaries {
        Boundaries::new(100, 5).unwrap()
    }

    #[test]
    fn init_holds_below_high_boundary() {
        assert_eq!(Init.step(99, bounds()), Step::to(Init));
    }

    #[test]
    fn init_switches_at_high_boundary() {
        assert_eq!(Init.step(100, bounds()), Step::to(TransitionToDischarge));
    }

    #[test]
    fn transitions_advance_regardless_of_charge() {
        for soc in [0, 5, 50, 100] {
            assert_eq!(
                TransitionToDischarge.step(soc, bounds()),
                Step::to(Discharging)
            );
            assert_eq!(TransitionToCharge.step(soc, bounds()), Step::to(Charging));
        }
    }

    #[test]
    fn discharging_switches_at_or_below_low_boundary() {
        assert_eq!(Discharging.step(6, bounds()), Step::to(Discharging));
        assert_eq!(Discharging.step(5, bounds()), Step::to(TransitionToCharge));
        assert_eq!(Discharging.step(4, bounds()), Step::to(TransitionToCharge));
    }

    #[test]
    fn only_charging_exit_completes_a_cycle() {
        let step = Charging.step(100, bounds());
        assert!(step.cycle_complete);
        assert_eq!(step.next, TransitionToDischarge);

        assert!(!Charging.step(99, bounds()).cycle_complete);
        for state in [Init, TransitionToDischarge, Discharging, TransitionToCharge] {
            for soc in 0..=100 {
                assert!(!state.step(soc, bounds()).cycle_complete);
            }
        }
    }

    #[test]
    fn no_state_is_skipped() {
        // Every step either stays put or moves to the single successor.
        let successor = |state: ControlState| match state {
            Init | Charging => TransitionToDischarge,
            TransitionToDischarge => Discharging,
            Discharging => TransitionToCharge,
            TransitionToCharge => Charging,
        };
        let narrow = Boundaries::new(60, 40).unwrap();
        for state in [Init, TransitionToDischarge, Discharging, TransitionToCharge, Charging] {
            for soc in 0..=100 {
                let next = state.step(soc, narrow).next;
                assert!(next == state || next == successor(state), "{state} -> {next}");
            }
        }
    }

    #[test]
    fn only_transition_states_issue_commands() {
        assert_eq!(TransitionToDischarge.command(), Some(ChargeMode::Discharge));
        assert_eq!(TransitionToCharge.command(), Some(ChargeMode::Normal));
        for state in [Init, Discharging, Charging] {
            assert_eq!(state.command(), None);
        }
    }

    #[test]
    fn displays_as_label() {
        assert_eq!(TransitionToDischarge.to_string(), "trans_discharge");
        assert_eq!(Charging.label(), "charge");
    }
}
