//! The restartable periodic loop shared by both roles
//!
//! A loop instance moves through `Idle -> Waiting -> Running -> Waiting ...`
//! until it observes its stop token, then reaches the terminal `Stopped`
//! state. The stop token is only checked while waiting, so a tick that has
//! started always runs to completion.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, sleep, timeout_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{SchedulerError, TickError};

/// How long a disabled loop waits before looking at its cadence again
pub const DISABLED_RECHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Longest period a loop will wait between ticks
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Monitor,
    Script,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Monitor => write!(f, "monitor"),
            Role::Script => write!(f, "script"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Every(Duration),
    Disabled,
}

impl Cadence {
    /// A zero period disables the loop
    pub fn from_period(period: Duration) -> Self {
        if period.is_zero() {
            Cadence::Disabled
        } else {
            Cadence::Every(period)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Waiting,
    Running,
    Stopped,
}

/// The body of a loop: what one tick does and how often it happens
#[async_trait]
pub trait LoopTask: Send + 'static {
    fn cadence(&self) -> Cadence;

    async fn tick(&mut self) -> Result<(), TickError>;
}

/// Owner side of one running loop instance
pub struct LoopHandle {
    role: Role,
    generation: u64,
    stop: CancellationToken,
    state: watch::Receiver<LoopState>,
    join: JoinHandle<()>,
}

impl LoopHandle {
    /// Spawn `task` on the current runtime
    pub fn spawn<T: LoopTask>(role: Role, generation: u64, task: T) -> Self {
        let stop = CancellationToken::new();
        let (state_tx, state) = watch::channel(LoopState::Idle);
        let join = tokio::spawn(run_loop(role, generation, task, stop.clone(), state_tx));

        Self {
            role,
            generation,
            stop,
            state,
            join,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Ask the loop to stop without waiting; repeated calls are no-ops
    pub fn signal_stop(&self) {
        self.stop.cancel();
    }

    /// Signal the loop and wait until it has exited, letting an in-flight
    /// tick finish first
    pub async fn stop(mut self) {
        self.finish().await;
    }

    // The handle must not be awaited again once these return
    async fn finish(&mut self) {
        self.stop.cancel();
        let result = (&mut self.join).await;
        log_exit(self.role, self.generation, result);
    }

    /// Aborts the task if it is still busy at `deadline`; returns whether it
    /// exited on its own
    async fn finish_by(&mut self, deadline: Instant) -> bool {
        self.stop.cancel();
        match timeout_at(deadline, &mut self.join).await {
            Ok(result) => {
                log_exit(self.role, self.generation, result);
                true
            }
            Err(_) => {
                warn!(
                    "{} loop (generation {}) did not stop in time, aborting it",
                    self.role, self.generation
                );
                self.join.abort();
                false
            }
        }
    }
}

fn log_exit(role: Role, generation: u64, result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("{} loop (generation {}) panicked: {}", role, generation, e);
        }
    }
}

async fn run_loop<T: LoopTask>(
    role: Role,
    generation: u64,
    mut task: T,
    stop: CancellationToken,
    state: watch::Sender<LoopState>,
) {
    info!("Starting {} loop (generation {})", role, generation);

    loop {
        match task.cadence() {
            Cadence::Every(period) => {
                run_periodic(role, &mut task, period, &stop, &state).await;
                break;
            }
            Cadence::Disabled => {
                state.send_replace(LoopState::Waiting);
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = sleep(DISABLED_RECHECK_INTERVAL) => {
                        debug!("{} loop is disabled, checking again", role);
                    }
                }
            }
        }
    }

    state.send_replace(LoopState::Stopped);
    info!("Stopped {} loop (generation {})", role, generation);
}

async fn run_periodic<T: LoopTask>(
    role: Role,
    task: &mut T,
    period: Duration,
    stop: &CancellationToken,
    state: &watch::Sender<LoopState>,
) {
    let now = Instant::now();
    let period = match now.checked_add(period) {
        Some(_) if period <= MAX_PERIOD => period,
        _ => {
            warn!(
                "{} period {:?} is too long, using {:?}",
                role, period, MAX_PERIOD
            );
            MAX_PERIOD
        }
    };

    // First tick one full period after start
    let mut ticker = interval_at(now + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        state.send_replace(LoopState::Waiting);
        // Stop wins when both branches are ready
        tokio::select! {
            biased;
            _ = stop.cancelled() => return,
            _ = ticker.tick() => {}
        }

        state.send_replace(LoopState::Running);
        if let Err(e) = task.tick().await {
            warn!("{} tick failed: {}", role, e);
        }
    }
}

/// The single live loop of one role
///
/// Generations start at 1 and grow by one with every start, so a restarted
/// loop is always distinguishable from the instance it replaced.
pub struct ReconfigurableLoop {
    role: Role,
    last_generation: u64,
    current: Option<LoopHandle>,
}

impl ReconfigurableLoop {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            last_generation: 0,
            current: None,
        }
    }

    /// Generation of the current instance, if one was started and not stopped
    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(LoopHandle::generation)
    }

    pub fn state(&self) -> Option<LoopState> {
        self.current.as_ref().map(LoopHandle::state)
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start `task` as the next generation; refuses while an instance is live
    pub fn start<T: LoopTask>(&mut self, task: T) -> Result<u64, SchedulerError> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning(self.role));
        }
        Ok(self.spawn_next(task))
    }

    /// Ask the current instance to stop without waiting for it
    pub fn signal_stop(&self) {
        if let Some(handle) = &self.current {
            handle.signal_stop();
        }
    }

    /// Stop the current instance and wait for it; a no-op when none is live
    ///
    /// The instance stays current until it has exited, so a caller dropped
    /// mid-wait leaves it signalled and visible to a later stop.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.current.as_mut() {
            debug!(
                "Stopping {} loop (generation {})",
                self.role,
                handle.generation()
            );
            handle.finish().await;
            self.current = None;
        }
    }

    /// Stop the current instance, aborting it if it outlives `deadline`
    pub async fn stop_by(&mut self, deadline: Instant) -> bool {
        let Some(handle) = self.current.as_mut() else {
            return true;
        };
        let exited = handle.finish_by(deadline).await;
        self.current = None;
        exited
    }

    /// Replace the current instance, if any, with `task`
    pub async fn restart<T: LoopTask>(&mut self, task: T) -> u64 {
        self.stop().await;
        self.spawn_next(task)
    }

    fn spawn_next<T: LoopTask>(&mut self, task: T) -> u64 {
        self.last_generation += 1;
        let handle = LoopHandle::spawn(self.role, self.last_generation, task);
        self.current = Some(handle);
        self.last_generation
    }
}
