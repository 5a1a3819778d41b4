#![forbid(unsafe_code)]

mod auction;
mod mutation;
mod record;

pub use auction::{AtomicStatus, Auction, AuctionStatus, ProductCondition};
pub use mutation::Mutation;
pub use record::AuctionRecord;
