//! Pacing and interruption.
//!
//! The control loop's only waits are plain sleeps: the sample delay and the
//! settle delays after a command. [`Pacer`] owns those sleeps and the
//! operator interrupt, so a signal is seen within one slice of arriving,
//! even in the middle of a long delay.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;

/// How often a sleeping pacer looks at the interrupt flag.
const SLICE: Duration = Duration::from_millis(100);

/// The operator asked the run to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("interrupted")]
pub struct Interrupted;

pub trait Pacer {
    /// Whether an interrupt has been requested.
    fn interrupted(&self) -> bool;

    /// Sleep for `duration`, returning early with `Interrupted` if asked to stop.
    fn pause(&mut self, duration: Duration) -> Result<(), Interrupted>;

    fn check(&self) -> Result<(), Interrupted> {
        if self.interrupted() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Real-time pacer driven by SIGINT and SIGTERM.
#[derive(Debug, Clone)]
pub struct SignalPacer {
    stop: Arc<AtomicBool>,
    slice: Duration,
}

impl SignalPacer {
    /// Route SIGINT and SIGTERM into the interrupt flag.
    ///
    /// Repeated signals only set the flag again. The process never dies on a
    /// signal, so the restore command always gets to run.
    pub fn register() -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM] {
            flag::register(signal, Arc::clone(&stop))?;
        }
        Ok(Self::with_flag(stop))
    }

    /// A pacer watching an existing flag.
    pub fn with_flag(stop: Arc<AtomicBool>) -> Self {
        Self { stop, slice: SLICE }
    }
}

impl Pacer for SignalPacer {
    fn interrupted(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn pause(&mut self, duration: Duration) -> Result<(), Interrupted> {
        // A delay too long for `Instant` has no deadline: only an interrupt ends it.
        let deadline = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let remaining =
                deadline.map_or(self.slice, |d| d.saturating_duration_since(Instant::now()));
            if remaining.is_zero() {
                return Ok(());
            }
            thread::sleep(remaining.min(self.slice));
        }
    }
}
