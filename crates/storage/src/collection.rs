use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use gavel_common::StoreError;
use gavel_entity::{AuctionRecord, AuctionStatus, Mutation};

use crate::store::{AuctionStore, UpdateResult};

/// Estado compartilhado entre todos os handles do store.
struct SharedState {
    documents: DashMap<String, AuctionRecord>,
    journal: Option<mpsc::Sender<Mutation>>,
}

/// Coleção de leilões em memória, opcionalmente persistida via journal.
#[derive(Clone)]
pub struct DocumentStore {
    shared: Arc<SharedState>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Store cujas escritas são enviadas ao `JournalWriter`.
    pub fn with_journal(journal: mpsc::Sender<Mutation>) -> Self {
        Self::build(Some(journal))
    }

    fn build(journal: Option<mpsc::Sender<Mutation>>) -> Self {
        DocumentStore {
            shared: Arc::new(SharedState {
                documents: DashMap::new(),
                journal,
            }),
        }
    }

    pub fn get(&self, id: &str) -> Option<AuctionRecord> {
        self.shared.documents.get(id).map(|doc| doc.clone())
    }

    pub fn len(&self) -> usize {
        self.shared.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.documents.is_empty()
    }

    /// Aplica uma mutação sem passar pelo journal (replay).
    pub(crate) fn apply(&self, mutation: Mutation) {
        match mutation {
            Mutation::Insert { record } => {
                self.shared.documents.insert(record.id.clone(), record);
            }
            Mutation::SetStatus { id, status } => {
                if let Some(mut doc) = self.shared.documents.get_mut(&id) {
                    doc.status = status;
                } else {
                    debug!("journal: set_status para _id inexistente: {id}");
                }
            }
        }
    }

    /// Reserva uma vaga no journal antes de tocar na memória. A mutação é
    /// enviada pelo permit ainda com o guard do documento em mãos, então a
    /// ordem no journal segue a ordem das escritas em cada `_id`.
    async fn reserve(&self) -> Result<Option<mpsc::Permit<'_, Mutation>>, StoreError> {
        let Some(ref tx) = self.shared.journal else {
            return Ok(None);
        };
        tx.reserve().await.map(Some).map_err(|_| {
            warn!("journal encerrado, escrita recusada");
            StoreError::Write("journal encerrado, mutação não persistida".into())
        })
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuctionStore for DocumentStore {
    async fn insert_one(&self, record: AuctionRecord) -> Result<(), StoreError> {
        let permit = self.reserve().await?;

        match self.shared.documents.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.id)),
            Entry::Vacant(slot) => {
                let slot = slot.insert(record);
                if let Some(permit) = permit {
                    permit.send(Mutation::Insert {
                        record: slot.value().clone(),
                    });
                }
                Ok(())
            }
        }
    }

    async fn update_status(
        &self,
        id: &str,
        status: AuctionStatus,
    ) -> Result<UpdateResult, StoreError> {
        let permit = self.reserve().await?;

        let Some(mut doc) = self.shared.documents.get_mut(id) else {
            return Ok(UpdateResult::default());
        };
        if doc.status == status {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }
        doc.status = status;
        if let Some(permit) = permit {
            permit.send(Mutation::SetStatus {
                id: id.to_string(),
                status,
            });
        }

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }

    async fn find_active(&self) -> Result<Vec<AuctionRecord>, StoreError> {
        Ok(self
            .shared
            .documents
            .iter()
            .filter(|doc| doc.status == AuctionStatus::Active)
            .map(|doc| doc.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_entity::ProductCondition;
    use std::collections::HashSet;

    fn record(id: &str) -> AuctionRecord {
        AuctionRecord {
            id: id.into(),
            product_name: "Cadeira".into(),
            category: "Móveis".into(),
            description: "Cadeira de escritório".into(),
            condition: ProductCondition::Used,
            status: AuctionStatus::Active,
            created_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = DocumentStore::new();
        store.insert_one(record("A1")).await.unwrap();
        assert_eq!(store.get("A1"), Some(record("A1")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_duplicate_id() {
        let store = DocumentStore::new();
        store.insert_one(record("A1")).await.unwrap();
        let err = store.insert_one(record("A1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref id) if id == "A1"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_status_counts() {
        let store = DocumentStore::new();
        store.insert_one(record("A1")).await.unwrap();

        let first = store
            .update_status("A1", AuctionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            first,
            UpdateResult {
                matched_count: 1,
                modified_count: 1
            }
        );

        // já está Completed: casa mas não modifica
        let second = store
            .update_status("A1", AuctionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(second.matched_count, 1);
        assert_eq!(second.modified_count, 0);
    }

    #[tokio::test]
    async fn update_status_not_found() {
        let store = DocumentStore::new();
        let result = store
            .update_status("missing", AuctionStatus::Completed)
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::default());
    }

    #[tokio::test]
    async fn find_active_skips_completed() {
        let store = DocumentStore::new();
        store.insert_one(record("A1")).await.unwrap();
        store.insert_one(record("A2")).await.unwrap();
        store
            .update_status("A1", AuctionStatus::Completed)
            .await
            .unwrap();

        let active = store.find_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "A2");
    }

    #[tokio::test]
    async fn writes_reach_journal_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let store = DocumentStore::with_journal(tx);
        store.insert_one(record("A1")).await.unwrap();
        store
            .update_status("A1", AuctionStatus::Completed)
            .await
            .unwrap();
        // update sem efeito não gera mutação
        store
            .update_status("A1", AuctionStatus::Completed)
            .await
            .unwrap();
        drop(store);

        assert_eq!(
            rx.recv().await,
            Some(Mutation::Insert {
                record: record("A1")
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(Mutation::SetStatus {
                id: "A1".into(),
                status: AuctionStatus::Completed
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn closed_journal_fails_writes() {
        let (tx, rx) = mpsc::channel(8);
        let store = DocumentStore::with_journal(tx);
        store.insert_one(record("A1")).await.unwrap();
        drop(rx);

        let err = store.insert_one(record("A2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert!(store.get("A2").is_none());

        let err = store
            .update_status("A1", AuctionStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(store.get("A1").unwrap().status, AuctionStatus::Active);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn journal_keeps_insert_before_status() {
        let (tx, mut rx) = mpsc::channel(1024);
        let store = DocumentStore::with_journal(tx);

        let mut handles = Vec::new();
        for i in 0..200 {
            let id = format!("A{i}");
            let inserter = store.clone();
            let doc = record(&id);
            handles.push(tokio::spawn(async move {
                inserter.insert_one(doc).await.map(|_| ())
            }));
            let closer = store.clone();
            handles.push(tokio::spawn(async move {
                closer
                    .update_status(&id, AuctionStatus::Completed)
                    .await
                    .map(|_| ())
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        drop(store);

        let mut inserted = HashSet::new();
        while let Some(mutation) = rx.recv().await {
            match mutation {
                Mutation::Insert { record } => {
                    inserted.insert(record.id);
                }
                Mutation::SetStatus { id, .. } => {
                    assert!(inserted.contains(&id), "set_status antes do insert de {id}");
                }
            }
        }
        assert_eq!(inserted.len(), 200);
    }
}
