//! External script execution for Vigil
//!
//! Scripts report their result as the last whitespace separated token of
//! their output. Anything that prevents reading that token is a failure
//! with the [`FAILURE_CODE`] sentinel.

mod error;
mod runner;

pub use error::ScriptError;
pub use runner::{parse_result_code, ProcessScriptRunner, ScriptRun, ScriptRunner, FAILURE_CODE};
