use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info};

use gavel_common::StoreError;
use gavel_entity::{Auction, AuctionRecord, AuctionStatus};
use gavel_storage::AuctionStore;

/// Resultado de um `close_status` que chegou ao store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Documento encontrado e status alterado.
    Closed,
    /// Nenhum documento com o `_id` informado.
    NotFound,
    /// Documento encontrado, mas já estava encerrado.
    Unchanged,
}

/// Operações do scheduler contra o store, cada uma com seu próprio timeout.
#[derive(Clone)]
pub struct AuctionGateway {
    store: Arc<dyn AuctionStore>,
    insert_timeout: Duration,
    close_timeout: Duration,
}

impl AuctionGateway {
    pub fn new(store: Arc<dyn AuctionStore>, insert_timeout: Duration, close_timeout: Duration) -> Self {
        Self {
            store,
            insert_timeout,
            close_timeout,
        }
    }

    /// Converte o leilão em documento e insere.
    pub async fn insert(&self, auction: &Auction) -> Result<(), StoreError> {
        let record = AuctionRecord::from(auction);
        debug!(auction_id = %record.id, "inserindo documento: {record:?}");

        timeout(self.insert_timeout, self.store.insert_one(record))
            .await
            .map_err(|_| StoreError::Timeout(self.insert_timeout))?
    }

    /// Marca o documento como `Completed`. O timeout conta a partir do
    /// início desta chamada e não depende de quem criou o leilão.
    pub async fn close_status(&self, id: &str) -> Result<CloseOutcome, StoreError> {
        let filter = json!({ "_id": id });
        let update = json!({ "$set": { "status": AuctionStatus::Completed } });
        info!(auction_id = id, %filter, %update, "atualizando status no store");

        let result = timeout(
            self.close_timeout,
            self.store.update_status(id, AuctionStatus::Completed),
        )
        .await
        .map_err(|_| StoreError::Timeout(self.close_timeout))??;

        info!(
            auction_id = id,
            matched_count = result.matched_count,
            modified_count = result.modified_count,
            "update concluído"
        );

        Ok(match (result.matched_count, result.modified_count) {
            (0, _) => CloseOutcome::NotFound,
            (_, 0) => CloseOutcome::Unchanged,
            _ => CloseOutcome::Closed,
        })
    }

    /// Documentos ainda ativos, para recuperar expirações após restart.
    pub async fn find_active(&self) -> Result<Vec<AuctionRecord>, StoreError> {
        timeout(self.insert_timeout, self.store.find_active())
            .await
            .map_err(|_| StoreError::Timeout(self.insert_timeout))?
    }
}
