pub mod consume_comments;

pub use consume_comments::{
    ConnectedWorker, ConsumptionSink, ConsumptionWorker, WorkerError, WorkerHandle,
};
