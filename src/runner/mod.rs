//! Run orchestration: scheduled probing, evaluation and delivery

pub mod orchestrator;
pub mod worker;

pub use orchestrator::{CycleReport, RunError, Runner};
pub use worker::RunnerWorker;
