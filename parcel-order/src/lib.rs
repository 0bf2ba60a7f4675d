pub mod machine;
pub mod models;

pub use machine::{OrderError, OrderStateMachine};
pub use models::{CarrierType, Order, OrderStatus};
