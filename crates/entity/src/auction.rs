use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use gavel_common::EntityError;

/// Condição do produto leiloado. Persistida como inteiro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ProductCondition {
    New = 1,
    Used = 2,
    Refurbished = 3,
}

impl From<ProductCondition> for u8 {
    fn from(condition: ProductCondition) -> u8 {
        condition as u8
    }
}

impl TryFrom<u8> for ProductCondition {
    type Error = EntityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProductCondition::New),
            2 => Ok(ProductCondition::Used),
            3 => Ok(ProductCondition::Refurbished),
            other => Err(EntityError::InvalidCondition(other)),
        }
    }
}

/// Status do leilão. `Completed` é terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AuctionStatus {
    Active = 0,
    Completed = 1,
}

impl From<AuctionStatus> for u8 {
    fn from(status: AuctionStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for AuctionStatus {
    type Error = EntityError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AuctionStatus::Active),
            1 => Ok(AuctionStatus::Completed),
            other => Err(EntityError::InvalidStatus(other)),
        }
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuctionStatus::Active => f.write_str("Active"),
            AuctionStatus::Completed => f.write_str("Completed"),
        }
    }
}

/// Célula atômica de status, lida pelo dono do leilão e escrita pela
/// tarefa de expiração.
pub struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    pub fn new(status: AuctionStatus) -> Self {
        Self(AtomicU8::new(status.into()))
    }

    pub fn load(&self) -> AuctionStatus {
        Self::decode(self.0.load(Ordering::Acquire))
    }

    /// Grava o novo status e devolve o anterior.
    pub fn swap(&self, status: AuctionStatus) -> AuctionStatus {
        Self::decode(self.0.swap(status.into(), Ordering::AcqRel))
    }

    // Só valores válidos são gravados, então o fallback nunca é usado.
    fn decode(raw: u8) -> AuctionStatus {
        AuctionStatus::try_from(raw).unwrap_or(AuctionStatus::Active)
    }
}

impl fmt::Debug for AtomicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicStatus").field(&self.load()).finish()
    }
}

/// Leilão em memória. Compartilhado (via `Arc`) entre quem o criou e a
/// tarefa de expiração enquanto a janela estiver aberta.
#[derive(Debug)]
pub struct Auction {
    pub id: String,
    pub product_name: String,
    pub category: String,
    pub description: String,
    pub condition: ProductCondition,
    pub created_at: OffsetDateTime,
    pub(crate) status: AtomicStatus,
}

impl Auction {
    /// Cria um leilão ativo com id explícito.
    pub fn new(
        id: impl Into<String>,
        product_name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        condition: ProductCondition,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            product_name: product_name.into(),
            category: category.into(),
            description: description.into(),
            condition,
            created_at,
            status: AtomicStatus::new(AuctionStatus::Active),
        }
    }

    /// Cria um leilão ativo com id UUID v4 e `created_at` = agora.
    pub fn create(
        product_name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
        condition: ProductCondition,
    ) -> Self {
        Self::new(
            Uuid::new_v4().to_string(),
            product_name,
            category,
            description,
            condition,
            OffsetDateTime::now_utc(),
        )
    }

    pub fn status(&self) -> AuctionStatus {
        self.status.load()
    }

    /// Marca o leilão como encerrado. Retorna o status anterior.
    pub fn complete(&self) -> AuctionStatus {
        self.status.swap(AuctionStatus::Completed)
    }

    /// Instante de encerramento para uma dada duração.
    pub fn end_time(&self, duration: Duration) -> OffsetDateTime {
        let duration = time::Duration::try_from(duration).unwrap_or(time::Duration::MAX);
        self.created_at.saturating_add(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Auction {
        Auction::new(
            "A1",
            "Notebook",
            "Eletrônicos",
            "Notebook usado em bom estado",
            ProductCondition::Used,
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn new_auction_is_active() {
        assert_eq!(sample().status(), AuctionStatus::Active);
    }

    #[test]
    fn complete_flips_once() {
        let auction = sample();
        assert_eq!(auction.complete(), AuctionStatus::Active);
        assert_eq!(auction.status(), AuctionStatus::Completed);
        // segunda chamada já encontra Completed
        assert_eq!(auction.complete(), AuctionStatus::Completed);
    }

    #[test]
    fn end_time_adds_duration() {
        let auction = sample();
        let end = auction.end_time(Duration::from_secs(30));
        assert_eq!(end.unix_timestamp(), 30);
    }

    #[test]
    fn create_generates_unique_ids() {
        let a = Auction::create("p", "c", "d", ProductCondition::New);
        let b = Auction::create("p", "c", "d", ProductCondition::New);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn invalid_condition_rejected() {
        assert!(matches!(
            ProductCondition::try_from(7),
            Err(EntityError::InvalidCondition(7))
        ));
    }
}
