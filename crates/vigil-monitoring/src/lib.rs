//! Machine health sampling and threshold evaluation
//!
//! This crate provides:
//! - CPU, memory and per-partition disk sampling via sysinfo
//! - Sliding-window averaging with configurable thresholds

pub mod evaluator;
pub mod sampler;

pub use evaluator::*;
pub use sampler::*;
