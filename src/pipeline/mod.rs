// src/pipeline/mod.rs

//! Polling pipeline: one poll cycle, and the scheduler loop around it.

pub mod poll;
pub mod scheduler;

pub use poll::{PollContext, run_cycle};
pub use scheduler::{FailureKind, classify, run_loop};
