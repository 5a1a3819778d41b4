use async_trait::async_trait;

use gavel_common::StoreError;
use gavel_entity::{AuctionRecord, AuctionStatus};

/// Resultado de um update por `_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Fronteira com o store persistente de documentos, chaveado por `_id`.
#[async_trait]
pub trait AuctionStore: Send + Sync + 'static {
    /// Insere um documento novo. `_id` repetido é erro.
    async fn insert_one(&self, record: AuctionRecord) -> Result<(), StoreError>;

    /// Atualiza só o campo `status` do documento com `_id == id`.
    async fn update_status(
        &self,
        id: &str,
        status: AuctionStatus,
    ) -> Result<UpdateResult, StoreError>;

    /// Todos os documentos ainda ativos.
    async fn find_active(&self) -> Result<Vec<AuctionRecord>, StoreError>;
}
