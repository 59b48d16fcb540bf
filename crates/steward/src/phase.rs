//! Run state shared by the controller, its watcher and its signal bridge.
//!
//! All mutable lifecycle state (the phase, the drain flag and the handle of
//! the live run cycle) sits behind one lock. Callers never get to read a flag
//! and write it back later: every decision that depends on the current state
//! is a single method here that checks and transitions under the write lock.

use std::sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::time::Duration;

use strum::Display;

use crate::controller::RunOutcome;

/// Lifecycle phase of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// No run cycle has started yet.
    Idle,
    /// The start callback is in flight.
    Starting,
    /// Start returned; waiting for a stop request.
    Running,
    /// The drain callback is in flight.
    Draining,
    /// The stop callback is in flight.
    Stopping,
    /// The last run cycle finished.
    Stopped,
}

impl Phase {
    /// Whether the controller counts as running: start has begun and no stop
    /// sequence has.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }

    const fn is_live(self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Running | Self::Draining | Self::Stopping
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Single-fire completion signal for one run cycle.
///
/// Created fresh by every `run` and never reused: once fired it stays fired,
/// and later cycles get their own instance.
#[derive(Debug)]
pub(crate) struct RunCycle {
    id: u64,
    outcome: Mutex<Option<RunOutcome>>,
    finished: Condvar,
}

impl RunCycle {
    fn new(id: u64) -> Self {
        Self {
            id,
            outcome: Mutex::new(None),
            finished: Condvar::new(),
        }
    }

    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    /// Records `outcome` and wakes every waiter. Only the first call wins.
    fn fire(&self, outcome: RunOutcome) -> bool {
        let mut slot = lock(&self.outcome);
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.finished.notify_all();
        true
    }

    pub(crate) fn outcome(&self) -> Option<RunOutcome> {
        *lock(&self.outcome)
    }

    /// Blocks until the cycle finishes.
    pub(crate) fn wait(&self) -> RunOutcome {
        let mut slot = lock(&self.outcome);
        loop {
            if let Some(outcome) = *slot {
                return outcome;
            }
            slot = self
                .finished
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until the cycle finishes or `timeout` elapses.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> Option<RunOutcome> {
        let slot = lock(&self.outcome);
        let (settled, _) = self
            .finished
            .wait_timeout_while(slot, timeout, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        *settled
    }
}

/// Result of asking to stop the live cycle.
#[derive(Debug)]
pub(crate) enum StopTicket {
    /// The caller won the race and must run the stop sequence now.
    Run { drain: bool, cycle: Arc<RunCycle> },
    /// Start is still in flight; the run thread stops once it returns.
    Deferred(Arc<RunCycle>),
    /// Another party is already running the stop sequence.
    InProgress(Arc<RunCycle>),
    /// No cycle is live.
    Idle,
}

/// What the run thread does once the start callback returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartTransition {
    /// Nobody asked to stop; the cycle is now running.
    Running,
    /// A stop arrived during start and the run thread now owns the sequence.
    Stop { drain: bool },
}

#[derive(Debug)]
struct PhaseState {
    phase: Phase,
    drain_enabled: bool,
    stop_deferred: bool,
    cycle: Option<Arc<RunCycle>>,
    cycles: u64,
}

/// Lock-guarded run state for one controller.
#[derive(Debug)]
pub(crate) struct PhaseGuard {
    state: RwLock<PhaseState>,
}

impl PhaseGuard {
    pub(crate) const fn new() -> Self {
        Self {
            state: RwLock::new(PhaseState {
                phase: Phase::Idle,
                drain_enabled: false,
                stop_deferred: false,
                cycle: None,
                cycles: 0,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PhaseState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PhaseState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn phase(&self) -> Phase {
        self.read().phase
    }

    pub(crate) fn is_running(&self) -> bool {
        self.read().phase.is_running()
    }

    pub(crate) fn drain_enabled(&self) -> bool {
        self.read().drain_enabled
    }

    pub(crate) fn current_cycle(&self) -> Option<Arc<RunCycle>> {
        self.read().cycle.clone()
    }

    /// Opens a new run cycle unless one is already live.
    pub(crate) fn begin_cycle(&self, drain_enabled: bool) -> Option<Arc<RunCycle>> {
        let mut state = self.write();
        if state.phase.is_live() {
            return None;
        }
        state.cycles += 1;
        let cycle = Arc::new(RunCycle::new(state.cycles));
        state.phase = Phase::Starting;
        state.drain_enabled = drain_enabled;
        state.stop_deferred = false;
        state.cycle = Some(Arc::clone(&cycle));
        Some(cycle)
    }

    /// Changes the drain flag of the live cycle. Returns `false` when no cycle
    /// is running, or its stop sequence already claimed the flag.
    pub(crate) fn set_drain_enabled(&self, enabled: bool) -> bool {
        let mut state = self.write();
        if !state.phase.is_running() {
            return false;
        }
        state.drain_enabled = enabled;
        true
    }

    /// Moves a starting cycle to running, or hands the run thread a stop that
    /// was requested while start was in flight.
    pub(crate) fn mark_started(&self) -> StartTransition {
        let mut state = self.write();
        if state.stop_deferred {
            state.stop_deferred = false;
            let drain = claim_stop(&mut state);
            return StartTransition::Stop { drain };
        }
        if state.phase == Phase::Starting {
            state.phase = Phase::Running;
        }
        StartTransition::Running
    }

    /// Claims the stop sequence for the caller if nobody else has.
    pub(crate) fn begin_stop(&self) -> StopTicket {
        let mut state = self.write();
        let Some(cycle) = state.cycle.clone() else {
            return StopTicket::Idle;
        };
        match state.phase {
            Phase::Running => {
                let drain = claim_stop(&mut state);
                StopTicket::Run { drain, cycle }
            }
            Phase::Starting => {
                state.stop_deferred = true;
                StopTicket::Deferred(cycle)
            }
            Phase::Draining | Phase::Stopping => StopTicket::InProgress(cycle),
            Phase::Idle | Phase::Stopped => StopTicket::Idle,
        }
    }

    /// Records that drain finished (or timed out) and stop is next.
    pub(crate) fn enter_stopping(&self) {
        let mut state = self.write();
        if state.phase == Phase::Draining {
            state.phase = Phase::Stopping;
        }
    }

    /// Closes the live cycle with `outcome` and releases everyone waiting on
    /// it.
    pub(crate) fn finish(&self, outcome: RunOutcome) -> RunOutcome {
        let cycle = {
            let mut state = self.write();
            state.phase = Phase::Stopped;
            state.drain_enabled = false;
            state.stop_deferred = false;
            state.cycle.take()
        };
        match cycle {
            Some(cycle) if !cycle.fire(outcome) => cycle.outcome().unwrap_or(outcome),
            _ => outcome,
        }
    }
}

/// Consumes the drain flag and enters the first phase of the stop sequence.
fn claim_stop(state: &mut PhaseState) -> bool {
    let drain = state.drain_enabled;
    state.drain_enabled = false;
    state.phase = if drain {
        Phase::Draining
    } else {
        Phase::Stopping
    };
    drain
}
