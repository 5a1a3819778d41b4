use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use gavel_common::{AuctionError, EVENT_CHANNEL_CAPACITY, StoreError};
use gavel_entity::Auction;
use gavel_storage::AuctionStore;

use crate::config::SchedulerConfig;
use crate::gateway::{AuctionGateway, CloseOutcome};
use crate::registry::ExpiryRegistry;

/// Desfecho terminal de uma tarefa de expiração.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryOutcome {
    Closed,
    NotFound,
    Unchanged,
    TimedOut,
    Failed(String),
    Cancelled,
}

/// Publicado exatamente uma vez por tarefa de expiração.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryEvent {
    pub auction_id: String,
    pub outcome: ExpiryOutcome,
}

/// Estado compartilhado entre o scheduler e as tarefas de expiração.
struct SharedState {
    registry: ExpiryRegistry,
    gateway: AuctionGateway,
    duration: Duration,
    tasks: TaskTracker,
    shutdown: CancellationToken,
    events: broadcast::Sender<ExpiryEvent>,
}

impl SharedState {
    fn publish(&self, auction_id: &str, outcome: ExpiryOutcome) {
        // Sem subscribers o evento é descartado.
        let _ = self.events.send(ExpiryEvent {
            auction_id: auction_id.to_string(),
            outcome,
        });
    }
}

/// Cria leilões e encerra cada um automaticamente ao fim da duração.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<SharedState>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn AuctionStore>, config: SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Scheduler {
            shared: Arc::new(SharedState {
                registry: ExpiryRegistry::new(),
                gateway: AuctionGateway::new(store, config.insert_timeout, config.close_timeout),
                duration: config.auction_duration,
                tasks: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                events,
            }),
        }
    }

    pub fn duration(&self) -> Duration {
        self.shared.duration
    }

    pub fn registry(&self) -> &ExpiryRegistry {
        &self.shared.registry
    }

    /// Agenda a expiração e insere o leilão no store.
    ///
    /// A tarefa de expiração é lançada antes do insert e roda mesmo que
    /// ele falhe. O erro devolvido não expõe detalhes do store. Depois do
    /// `shutdown` nada é agendado nem inserido.
    pub async fn create(&self, auction: Arc<Auction>) -> Result<(), AuctionError> {
        info!(auction_id = %auction.id, "iniciando criação do leilão");

        self.schedule(auction.clone(), self.shared.duration)?;

        if let Err(e) = self.shared.gateway.insert(&auction).await {
            error!(auction_id = %auction.id, "erro ao tentar inserir leilão: {e}");
            return Err(AuctionError::Internal);
        }

        info!(auction_id = %auction.id, "leilão criado e inserido no store");
        Ok(())
    }

    /// Reagenda os leilões ainda ativos no store com o tempo restante.
    /// Leilões cujo fim já passou são encerrados imediatamente.
    pub async fn recover(&self) -> Result<usize, StoreError> {
        let records = self.shared.gateway.find_active().await?;
        let now = OffsetDateTime::now_utc();
        let mut count = 0;

        for record in records {
            let id = record.id.clone();
            let auction = match Auction::try_from(record) {
                Ok(auction) => Arc::new(auction),
                Err(e) => {
                    warn!(auction_id = %id, "documento ignorado na recuperação: {e}");
                    continue;
                }
            };

            let remaining = auction.end_time(self.shared.duration) - now;
            let wait = Duration::try_from(remaining).unwrap_or(Duration::ZERO);

            match self.schedule(auction, wait) {
                Ok(()) => count += 1,
                Err(e) => debug!(auction_id = %id, "recuperação ignorada: {e}"),
            }
        }

        info!("{count} expirações pendentes recuperadas");
        Ok(count)
    }

    /// Cancela a expiração pendente de `id`. O leilão continua ativo.
    pub fn cancel(&self, id: &str) -> bool {
        self.shared.registry.cancel(id)
    }

    /// Fins de leilão ainda pendentes.
    pub fn pending(&self) -> Vec<(String, OffsetDateTime)> {
        self.shared.registry.snapshot()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.shared.registry.contains(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExpiryEvent> {
        self.shared.events.subscribe()
    }

    /// Interrompe as esperas pendentes e aguarda as tarefas terminarem.
    /// Encerramentos já em curso vão até o fim (limitados pelo timeout).
    pub async fn shutdown(&self) {
        info!(
            "shutdown do scheduler: {} expirações pendentes",
            self.shared.registry.len()
        );
        self.shared.tasks.close();
        self.shared.shutdown.cancel();
        self.shared.tasks.wait().await;
        info!("scheduler encerrado");
    }

    fn schedule(&self, auction: Arc<Auction>, wait: Duration) -> Result<(), AuctionError> {
        if self.shared.shutdown.is_cancelled() {
            warn!(auction_id = %auction.id, "scheduler encerrado, expiração não agendada");
            return Err(AuctionError::ShuttingDown);
        }

        let end_time = auction.end_time(self.shared.duration);
        let cancel = self.shared.shutdown.child_token();

        if !self
            .shared
            .registry
            .try_register(&auction.id, end_time, cancel.clone())
        {
            warn!(auction_id = %auction.id, "expiração já agendada");
            return Err(AuctionError::AlreadyScheduled(auction.id.clone()));
        }

        let shared = self.shared.clone();
        self.shared.tasks.spawn(async move {
            expire_auction(shared, auction, end_time, wait, cancel).await;
        });
        Ok(())
    }
}

/// Tarefa de expiração de um leilão.
async fn expire_auction(
    shared: Arc<SharedState>,
    auction: Arc<Auction>,
    end_time: OffsetDateTime,
    wait: Duration,
    cancel: CancellationToken,
) {
    let id = auction.id.as_str();
    info!(auction_id = id, %end_time, "tarefa de expiração iniciada, leilão termina em {wait:?}");

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            shared.registry.unregister(id);
            info!(auction_id = id, "expiração cancelada, leilão permanece ativo");
            shared.publish(id, ExpiryOutcome::Cancelled);
            return;
        }
        _ = tokio::time::sleep(wait) => {}
    }

    info!(auction_id = id, "tempo do leilão acabou, encerrando");

    // Sai do registry antes de tentar persistir.
    shared.registry.unregister(id);

    let before = auction.complete();
    info!(
        auction_id = id,
        %before,
        after = %auction.status(),
        "status do leilão atualizado em memória"
    );

    let outcome = match shared.gateway.close_status(id).await {
        Ok(CloseOutcome::Closed) => {
            info!(auction_id = id, "status do leilão atualizado com sucesso");
            ExpiryOutcome::Closed
        }
        Ok(CloseOutcome::NotFound) => {
            warn!(auction_id = id, "nenhum documento encontrado com o id informado");
            ExpiryOutcome::NotFound
        }
        Ok(CloseOutcome::Unchanged) => {
            info!(auction_id = id, "documento já estava encerrado");
            ExpiryOutcome::Unchanged
        }
        Err(StoreError::Timeout(limit)) => {
            error!(auction_id = id, "update do status excedeu {limit:?}, store não alterado");
            ExpiryOutcome::TimedOut
        }
        Err(e) => {
            error!(auction_id = id, "erro ao atualizar status do leilão: {e}");
            ExpiryOutcome::Failed(e.to_string())
        }
    };

    shared.publish(id, outcome);
}
