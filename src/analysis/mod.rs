pub mod coordinator;
pub mod worker;

pub use coordinator::AutoCutCoordinator;
pub use worker::{AnalysisEvents, SilenceAnalysisWorker, WorkerClient, WorkerConfig};
