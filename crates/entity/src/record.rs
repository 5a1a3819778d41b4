use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use gavel_common::EntityError;

use crate::auction::{AtomicStatus, Auction, AuctionStatus, ProductCondition};

/// Documento persistido de um leilão. `created_at` vira `timestamp` em
/// segundos desde a epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub product_name: String,
    pub category: String,
    pub description: String,
    pub condition: ProductCondition,
    pub status: AuctionStatus,
    #[serde(rename = "timestamp")]
    pub created_at: i64,
}

impl From<&Auction> for AuctionRecord {
    fn from(auction: &Auction) -> Self {
        Self {
            id: auction.id.clone(),
            product_name: auction.product_name.clone(),
            category: auction.category.clone(),
            description: auction.description.clone(),
            condition: auction.condition,
            status: auction.status(),
            created_at: auction.created_at.unix_timestamp(),
        }
    }
}

impl TryFrom<AuctionRecord> for Auction {
    type Error = EntityError;

    fn try_from(record: AuctionRecord) -> Result<Self, Self::Error> {
        let created_at = OffsetDateTime::from_unix_timestamp(record.created_at)
            .map_err(|_| EntityError::InvalidTimestamp(record.created_at))?;
        Ok(Auction {
            id: record.id,
            product_name: record.product_name,
            category: record.category,
            description: record.description,
            condition: record.condition,
            created_at,
            status: AtomicStatus::new(record.status),
        })
    }
}
