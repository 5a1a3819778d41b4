#![forbid(unsafe_code)]

mod error;

use std::time::Duration;

pub use error::*;

/// Variável de ambiente com a duração dos leilões (ex: "30s", "2h").
pub const AUCTION_DURATION_ENV: &str = "AUCTION_DURATION";
pub const DEFAULT_AUCTION_DURATION: Duration = Duration::from_secs(30);
/// Timeout de cada operação contra o store, contado do início da chamada.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(10);
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const JOURNAL_BUFFER_SIZE: usize = 10_000;
