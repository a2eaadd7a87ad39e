use thiserror::Error;
use vigil_monitoring::SampleError;
use vigil_scripts::ScriptError;

use crate::loop_runner::Role;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("The {0} loop is already running")]
    AlreadyRunning(Role),
}

/// Failure of a single tick; logged by the loop, which keeps running
#[derive(Error, Debug)]
pub enum TickError {
    #[error("Sampling failed: {0}")]
    Sample(#[from] SampleError),

    #[error("Script run failed: {0}")]
    Script(#[from] ScriptError),
}
