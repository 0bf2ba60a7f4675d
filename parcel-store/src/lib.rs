pub mod app_config;
pub mod memory;
pub mod realtime;

pub use memory::{MemoryAttemptStore, MemoryOrderStore};
pub use realtime::RealtimeHub;
