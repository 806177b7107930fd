//! Charge control: force the embedded controller into a charge mode.
//!
//! [`ChargeController`] is the narrow command interface the state machine
//! uses. [`EcTool`] implements it by running `ectool chargecontrol <mode>`
//! and waiting for it to exit. Neither verifies that the battery actually
//! switched; that shows up in later telemetry.

use std::{
    path::PathBuf,
    process::{Command, ExitStatus},
};

use crate::model::ChargeMode;

/// A control command could not be run or reported failure.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

pub type Result<T> = core::result::Result<T, ControlError>;

pub trait ChargeController {
    fn force_discharge(&mut self) -> Result<()>;

    fn force_charge_normal(&mut self) -> Result<()>;

    /// Dispatch on mode.
    fn apply(&mut self, mode: ChargeMode) -> Result<()> {
        match mode {
            ChargeMode::Discharge => self.force_discharge(),
            ChargeMode::Normal => self.force_charge_normal(),
        }
    }
}

/// Drives the EC through the `ectool` command-line utility.
#[derive(Debug, Clone)]
pub struct EcTool {
    program: PathBuf,
}

impl EcTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Ask the EC for its firmware version.
    pub fn version(&self) -> Result<String> {
        let output = self.run(&["version"])?;
        Ok(output.trim().to_string())
    }

    fn chargecontrol(&self, mode: ChargeMode) -> Result<()> {
        self.run(&["chargecontrol", mode.as_arg()]).map(drop)
    }

    /// Run the tool with `args` and return its stdout on success.
    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| ControlError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ControlError::Failed {
                command: format!("{} {}", self.program.display(), args.join(" ")),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl ChargeController for EcTool {
    fn force_discharge(&mut self) -> Result<()> {
        self.chargecontrol(ChargeMode::Discharge)
    }

    fn force_charge_normal(&mut self) -> Result<()> {
        self.chargecontrol(ChargeMode::Normal)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn succeeding_command_is_ok() {
        let mut tool = EcTool::new("true");

        tool.force_discharge().unwrap();
        tool.apply(ChargeMode::Normal).unwrap();
    }

    #[test]
    fn nonzero_exit_is_failed() {
        let err = EcTool::new("false").force_charge_normal().unwrap_err();

        match err {
            ControlError::Failed { command, status, .. } => {
                assert_eq!(command, "false chargecontrol normal");
                assert!(!status.success());
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = EcTool::new("/nonexistent/ectool")
            .force_discharge()
            .unwrap_err();

        assert!(matches!(err, ControlError::Spawn { .. }));
    }

    #[test]
    fn version_returns_trimmed_stdout() {
        // `echo version` prints its argument back.
        let version = EcTool::new("echo").version().unwrap();
        assert_eq!(version, "version");
    }
}
