#![forbid(unsafe_code)]

mod collection;
pub mod journal;
mod store;

pub use collection::DocumentStore;
pub use journal::{FsyncPolicy, JournalWriter, create_journal, replay_journal};
pub use store::{AuctionStore, UpdateResult};
