pub mod progress;
pub mod worker_event;

pub use progress::ConsumptionProgress;
pub use worker_event::{DrainReason, WorkerEvent, WorkerReport, WorkerState};
