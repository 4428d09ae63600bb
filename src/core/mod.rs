pub mod analysis;
pub mod call_registry;
pub mod dispatch;
pub mod lifecycle;
pub mod resource_pool;
pub mod scenario;
pub mod scheduler;
pub mod simulation;
pub mod transcript_store;

pub use crate::domain::model::{Call, CallId, PoolSnapshot, ServiceType, TranscriptEntry};
pub use crate::domain::ports::TipsProvider;
pub use crate::utils::error::Result;
