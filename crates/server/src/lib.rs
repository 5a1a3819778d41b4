#![forbid(unsafe_code)]

pub mod config;
pub mod gateway;
pub mod registry;
pub mod scheduler;

pub use config::{SchedulerConfig, resolve_duration};
pub use gateway::{AuctionGateway, CloseOutcome};
pub use registry::{ExpiryRegistry, PendingExpiry};
pub use scheduler::{ExpiryEvent, ExpiryOutcome, Scheduler};
