pub mod orchestrator;
pub mod retrier;

pub use orchestrator::{MockProcessor, PaymentOrchestrator};
pub use retrier::{PropagationOutcome, RetryPolicy, StatusPropagator};
