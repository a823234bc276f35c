//! Execution engine
//!
//! Walks a gated plan against the controller for its application, one step
//! at a time, and folds the outcomes into an `ExecutionSummary`. A
//! `CancellationToken` stops the walk before the next step is dispatched.

pub mod executor;
pub mod summary;

pub use executor::ExecutionEngine;
pub use summary::{ExecutionSummary, StepOutcome, StepResult};
pub use tokio_util::sync::CancellationToken;
