//! The cycling state machine.
//!
//! [`CycleRunner`] owns the control state and the cycle counter and drives
//! the leaf services through one tick at a time:
//!
//! 1. If the state is a transition, issue its command and wait the settle delay.
//! 2. Take one telemetry snapshot and apply the state's exit condition to it.
//! 3. Append one log row.
//! 4. If the tick completed a cycle, return to the outer loop; otherwise
//!    sleep the sample delay and tick again.
//!
//! The iteration limit is checked only between cycles, so a cycle in flight
//! always finishes. An interrupt, or a fatal error inside the loop, ends the
//! run with exactly one `force_charge_normal` call.

use std::{io, time::Duration};

use tracing::{debug, error, info, warn};

use crate::{
    config::TestPlan,
    control::ChargeController,
    event_log::EventLog,
    model::{ChargeMode, ControlState, PowerStatus},
    pacer::{Interrupted, Pacer},
    telemetry::{TelemetryError, TelemetrySource},
};

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("battery is {0}: connect AC and try again")]
    Precondition(PowerStatus),

    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("failed to write log: {0}")]
    Log(#[from] io::Error),
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every planned cycle finished.
    Completed { cycles: u32 },

    /// The operator stopped the run.
    Interrupted { cycle: u32, state: ControlState },
}

/// Why the loop stopped before the plan was done.
#[derive(Debug)]
enum Halt {
    Interrupted,
    Failed(CycleError),
}

impl From<Interrupted> for Halt {
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

impl From<TelemetryError> for Halt {
    fn from(e: TelemetryError) -> Self {
        Self::Failed(e.into())
    }
}

impl From<io::Error> for Halt {
    fn from(e: io::Error) -> Self {
        Self::Failed(e.into())
    }
}

/// Drives one run of the plan against a telemetry source, a charge
/// controller and a pacer.
pub struct CycleRunner<'a, T, C, P> {
    plan: &'a TestPlan,
    telemetry: T,
    controller: C,
    pacer: P,
    log: EventLog,
    state: ControlState,
    cycle: u32,
}

impl<'a, T, C, P> CycleRunner<'a, T, C, P>
where
    T: TelemetrySource,
    C: ChargeController,
    P: Pacer,
{
    pub fn new(plan: &'a TestPlan, telemetry: T, controller: C, pacer: P, log: EventLog) -> Self {
        Self {
            plan,
            telemetry,
            controller,
            pacer,
            log,
            state: ControlState::Init,
            cycle: 1,
        }
    }

    /// Current control state.
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// The cycle in progress, counting from 1.
    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    /// Run the whole test.
    ///
    /// Refuses to start when the battery is already discharging (AC
    /// unplugged): no command is issued and no row is logged.
    pub fn run(&mut self) -> Result<RunOutcome, CycleError> {
        self.preflight()?;
        self.log.init_header()?;

        info!(
            iterations = self.plan.iterations,
            high = self.plan.bounds.high(),
            low = self.plan.bounds.low(),
            delay_secs = self.plan.delay.as_secs(),
            log = %self.log.path().display(),
            "starting battery cycle test"
        );

        match self.drive() {
            Ok(()) => Ok(RunOutcome::Completed {
                cycles: self.cycle - 1,
            }),
            Err(Halt::Interrupted) => {
                warn!(
                    cycle = self.cycle,
                    state = %self.state,
                    "interrupted, setting charge control to normal"
                );
                self.leave_safe();
                Ok(RunOutcome::Interrupted {
                    cycle: self.cycle(),
                    state: self.state(),
                })
            }
            Err(Halt::Failed(e)) => {
                error!(cycle = self.cycle, state = %self.state, error = %e, "run failed");
                self.leave_safe();
                Err(e)
            }
        }
    }

    fn preflight(&mut self) -> Result<(), CycleError> {
        let status = self.telemetry.power_status()?;
        debug!(%status, "power status before start");
        if status.is_discharging() {
            return Err(CycleError::Precondition(status));
        }
        Ok(())
    }

    fn drive(&mut self) -> Result<(), Halt> {
        while self.cycle <= self.plan.iterations {
            loop {
                self.pacer.check()?;
                if self.tick()? {
                    break;
                }
                self.pacer.pause(self.plan.delay)?;
            }
            info!(cycle = self.cycle, "cycle complete");
            self.cycle += 1;
        }
        self.pacer.check()?;
        Ok(())
    }

    /// One state evaluation and one log row. Returns true when a cycle completed.
    fn tick(&mut self) -> Result<bool, Halt> {
        let state = self.state;

        if let Some(mode) = state.command() {
            self.command(mode);
            self.pacer.pause(self.settle_delay(mode))?;
        }

        let snapshot = self.telemetry.snapshot()?;
        let step = state.step(snapshot.state_of_charge, self.plan.bounds);

        debug!(
            cycle = self.cycle,
            state = %state,
            soc = snapshot.state_of_charge,
            high = self.plan.bounds.high(),
            low = self.plan.bounds.low(),
            "tick"
        );
        if step.next != state {
            info!(
                cycle = self.cycle,
                from = %state,
                to = %step.next,
                soc = snapshot.state_of_charge,
                "state transition"
            );
        }

        self.state = step.next;
        self.log.append(self.cycle, &snapshot)?;
        Ok(step.cycle_complete)
    }

    /// Issue a charge-mode command. Failure is reported, not retried: the
    /// boundary check keeps running and shows whether the mode took.
    fn command(&mut self, mode: ChargeMode) {
        match self.controller.apply(mode) {
            Ok(()) => debug!(%mode, "charge control set"),
            Err(e) => warn!(%mode, error = %e, "charge control command failed"),
        }
    }

    fn settle_delay(&self, mode: ChargeMode) -> Duration {
        match mode {
            ChargeMode::Discharge => self.plan.settle.discharge,
            ChargeMode::Normal => self.plan.settle.charge,
        }
    }

    fn leave_safe(&mut self) {
        match self.controller.force_charge_normal() {
            Ok(()) => info!("charge control set to normal"),
            Err(e) => error!(error = %e, "failed to restore normal charging"),
        }
    }
}
