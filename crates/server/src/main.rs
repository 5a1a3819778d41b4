use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{debug, error, info, warn};

use gavel_common::{AUCTION_DURATION_ENV, JOURNAL_BUFFER_SIZE, STORE_TIMEOUT};
use gavel_entity::{Auction, ProductCondition};
use gavel_server::{Scheduler, SchedulerConfig, resolve_duration};
use gavel_storage::{DocumentStore, FsyncPolicy, create_journal, replay_journal};

#[derive(Parser, Debug)]
#[command(name = "gavel-server", about = "Gavel — leilões com encerramento automático")]
struct Args {
    /// Duração de cada leilão (ex: 30s, 2h). Inválida cai em 30s.
    #[arg(long, env = AUCTION_DURATION_ENV)]
    auction_duration: Option<String>,
    #[arg(long, default_value_t = STORE_TIMEOUT.as_secs())]
    close_timeout_secs: u64,
    #[arg(long, value_name = "FILE")]
    journal: Option<PathBuf>,
    #[arg(long, default_value = "everysec", value_parser = parse_fsync)]
    fsync: FsyncPolicy,
}

fn parse_fsync(s: &str) -> Result<FsyncPolicy, String> {
    match s.to_lowercase().as_str() {
        "always" => Ok(FsyncPolicy::Always),
        "everysec" => Ok(FsyncPolicy::EverySec),
        "no" => Ok(FsyncPolicy::No),
        _ => Err(format!("valor inválido: '{s}'. Use: always, everysec, no")),
    }
}

/// Uma linha JSON lida do stdin.
#[derive(Debug, Deserialize)]
struct CreateAuctionRequest {
    product_name: String,
    category: String,
    description: String,
    condition: ProductCondition,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gavel_server=info,gavel_storage=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = SchedulerConfig {
        auction_duration: resolve_duration(args.auction_duration.as_deref()),
        close_timeout: Duration::from_secs(args.close_timeout_secs),
        ..SchedulerConfig::default()
    };

    // Replay do journal antes de abrir o writer
    let (store, journal_task) = if let Some(ref path) = args.journal {
        let (tx, writer) = create_journal(path.clone(), args.fsync, JOURNAL_BUFFER_SIZE);
        let store = DocumentStore::with_journal(tx);
        let count = replay_journal(path, &store).await?;
        if count > 0 {
            info!("{count} mutações restauradas do journal");
        }

        let handle = tokio::spawn(async move {
            if let Err(e) = writer.run().await {
                error!("journal writer erro: {e}");
            }
        });
        (store, Some(handle))
    } else {
        (DocumentStore::new(), None)
    };

    let scheduler = Scheduler::new(Arc::new(store.clone()), config);
    info!("duração dos leilões: {:?}", scheduler.duration());
    scheduler.recover().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("aguardando requisições de criação no stdin (uma por linha)");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => handle_request(&scheduler, &line).await,
                    None => {
                        info!("stdin encerrado, aguardando expirações pendentes");
                        drain(&scheduler).await;
                        break;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutdown signal recebido");
                break;
            }
        }
    }

    scheduler.shutdown().await;

    // Drop dos handles do store fecha o channel do journal
    drop(scheduler);
    drop(store);
    if let Some(handle) = journal_task {
        handle.await?;
    }

    Ok(())
}

async fn handle_request(scheduler: &Scheduler, line: &str) {
    let request: CreateAuctionRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("requisição inválida ignorada: {e}");
            return;
        }
    };

    let auction = Arc::new(Auction::create(
        request.product_name,
        request.category,
        request.description,
        request.condition,
    ));

    match scheduler.create(auction.clone()).await {
        Ok(()) => info!(auction_id = %auction.id, "leilão aberto"),
        Err(e) => error!(auction_id = %auction.id, "falha ao criar leilão: {e}"),
    }
}

/// Espera todas as expirações pendentes dispararem ou um Ctrl-C.
async fn drain(scheduler: &Scheduler) {
    let mut events = scheduler.subscribe();

    while !scheduler.registry().is_empty() {
        tokio::select! {
            event = events.recv() => {
                if let Ok(event) = event {
                    debug!("expiração concluída: {event:?}");
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutdown signal recebido");
                return;
            }
        }
    }
}
