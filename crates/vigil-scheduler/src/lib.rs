//! Reconfigurable periodic scheduling for Vigil
//!
//! [`SchedulerCore`] owns one [`ReconfigurableLoop`] per [`Role`]. Each loop
//! captures its policy when it starts; configuration edits take effect when
//! the caller restarts the matching role.

mod alerts;
mod error;
mod loop_runner;
mod monitor_task;
mod scheduler;
mod script_task;

pub use alerts::AlertNotifier;
pub use error::{SchedulerError, TickError};
pub use loop_runner::{
    Cadence, LoopHandle, LoopState, LoopTask, ReconfigurableLoop, Role, DISABLED_RECHECK_INTERVAL,
    MAX_PERIOD,
};
pub use monitor_task::MonitorTask;
pub use scheduler::SchedulerCore;
pub use script_task::ScriptTask;
