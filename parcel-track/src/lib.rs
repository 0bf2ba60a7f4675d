pub mod event;
pub mod normalizer;
pub mod presentation;
pub mod reconciler;
pub mod tracker;

pub use event::StatusEvent;
pub use normalizer::normalize;
pub use reconciler::{DriverInfo, GeoPoint, ReconciledStatus, Reconciler};
pub use tracker::OrderTracker;
