#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use gavel_common::StoreError;
use gavel_entity::{Auction, AuctionRecord, AuctionStatus, ProductCondition};
use gavel_storage::{AuctionStore, UpdateResult};

/// Store em memória com falhas e latência configuráveis.
#[derive(Default)]
pub struct FakeStore {
    pub records: Mutex<HashMap<String, AuctionRecord>>,
    pub updates: Mutex<Vec<(String, AuctionStatus)>>,
    pub fail_insert: bool,
    pub fail_update: bool,
    pub update_delay: Option<Duration>,
}

impl FakeStore {
    pub fn record(&self, id: &str) -> Option<AuctionRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Updates tentados (inclusive os que falharam).
    pub fn updates(&self) -> Vec<(String, AuctionStatus)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuctionStore for FakeStore {
    async fn insert_one(&self, record: AuctionRecord) -> Result<(), StoreError> {
        if self.fail_insert {
            return Err(StoreError::Write("connection refused".into()));
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: AuctionStatus,
    ) -> Result<UpdateResult, StoreError> {
        self.updates.lock().unwrap().push((id.to_string(), status));

        if let Some(delay) = self.update_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_update {
            return Err(StoreError::Write("connection reset".into()));
        }

        let mut records = self.records.lock().unwrap();
        Ok(match records.get_mut(id) {
            None => UpdateResult::default(),
            Some(record) if record.status == status => UpdateResult {
                matched_count: 1,
                modified_count: 0,
            },
            Some(record) => {
                record.status = status;
                UpdateResult {
                    matched_count: 1,
                    modified_count: 1,
                }
            }
        })
    }

    async fn find_active(&self) -> Result<Vec<AuctionRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == AuctionStatus::Active)
            .cloned()
            .collect())
    }
}

pub fn auction(id: &str) -> Auction {
    Auction::new(
        id,
        "Câmera",
        "Fotografia",
        "Câmera mirrorless com lente",
        ProductCondition::Used,
        OffsetDateTime::now_utc(),
    )
}
