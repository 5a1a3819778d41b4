use std::time::Duration;

/// Erros de escrita/leitura contra o store persistente.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("falha de escrita no store: {0}")]
    Write(String),
    #[error("documento com _id '{0}' já existe")]
    Duplicate(String),
    #[error("falha de serialização: {0}")]
    Serialization(String),
    #[error("operação no store excedeu o timeout de {0:?}")]
    Timeout(Duration),
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros de conversão entre a entidade e sua representação persistida.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("condição de produto inválida: {0}")]
    InvalidCondition(u8),
    #[error("status de leilão inválido: {0}")]
    InvalidStatus(u8),
    #[error("timestamp fora do intervalo: {0}")]
    InvalidTimestamp(i64),
    #[error("mutação com encoding inválido: {0}")]
    Encoding(String),
}

/// Erros devolvidos a quem cria um leilão.
///
/// `Internal` nunca carrega o detalhe do store; ele fica só nos logs.
#[derive(Debug, thiserror::Error)]
pub enum AuctionError {
    #[error("erro ao tentar inserir o leilão")]
    Internal,
    #[error("leilão '{0}' já possui expiração agendada")]
    AlreadyScheduled(String),
    #[error("scheduler encerrado, leilão não foi criado")]
    ShuttingDown,
}

impl From<EntityError> for StoreError {
    fn from(e: EntityError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
