use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{info, warn};

use gavel_entity::Mutation;

use crate::DocumentStore;

/// Política de fsync.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    /// Fsync após cada mutação.
    Always,
    /// Fsync a cada segundo.
    #[default]
    EverySec,
    /// Sem fsync explícito (deixa pro OS).
    No,
}

/// Writer que recebe mutações via channel e faz append no journal.
///
/// Cada volta do loop drena o que já está no channel e grava o lote com
/// um único `write_all`.
pub struct JournalWriter {
    rx: mpsc::Receiver<Mutation>,
    path: PathBuf,
    policy: FsyncPolicy,
}

impl JournalWriter {
    pub fn new(rx: mpsc::Receiver<Mutation>, path: PathBuf, policy: FsyncPolicy) -> Self {
        Self { rx, path, policy }
    }

    /// Termina quando todos os senders são dropados, com o arquivo sincronizado.
    pub async fn run(mut self) -> std::io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut out = BufWriter::new(file);
        let mut batch = BytesMut::with_capacity(4096);

        let mut sync_tick = interval(Duration::from_secs(1));
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let periodic = self.policy == FsyncPolicy::EverySec;

        info!(path = ?self.path, policy = ?self.policy, "journal writer iniciado");

        loop {
            tokio::select! {
                received = self.rx.recv() => {
                    let Some(first) = received else { break };

                    let lines = self.fill_batch(first, &mut batch);
                    if lines == 0 {
                        continue;
                    }
                    out.write_all(&batch).await?;
                    batch.clear();

                    if self.policy == FsyncPolicy::Always {
                        sync(&mut out).await?;
                    }
                }
                _ = sync_tick.tick(), if periodic => sync(&mut out).await?,
            }
        }

        sync(&mut out).await?;
        info!("journal writer encerrado");
        Ok(())
    }

    /// Codifica `first` e tudo que já estiver pendente no channel.
    fn fill_batch(&mut self, first: Mutation, batch: &mut BytesMut) -> usize {
        let mut lines = 0;
        let mut next = Some(first);
        while let Some(mutation) = next {
            match mutation.encode(batch) {
                Ok(()) => lines += 1,
                Err(e) => warn!("journal: mutação de '{}' descartada: {e}", mutation.id()),
            }
            next = self.rx.try_recv().ok();
        }
        lines
    }
}

async fn sync(out: &mut BufWriter<File>) -> std::io::Result<()> {
    out.flush().await?;
    out.get_ref().sync_data().await
}

/// Lê o journal e reaplica as mutações no store para reconstruir o estado.
pub async fn replay_journal(path: &Path, store: &DocumentStore) -> std::io::Result<usize> {
    if !path.exists() {
        info!("journal não encontrado, iniciando sem dados");
        return Ok(0);
    }

    let data = tokio::fs::read(path).await?;
    let mut buf = BytesMut::from(&data[..]);
    let mut count = 0;

    while !buf.is_empty() {
        match Mutation::decode(&mut buf) {
            Ok(Some(mutation)) => {
                store.apply(mutation);
                count += 1;
            }
            Ok(None) => {
                warn!("journal: linha incompleta no final do arquivo, parando replay");
                break;
            }
            Err(e) => {
                warn!("journal: linha corrompida, parando replay: {e}");
                break;
            }
        }
    }

    info!("replay do journal completo: {count} mutações restauradas");
    Ok(count)
}

/// Cria um par (sender, JournalWriter).
pub fn create_journal(
    path: PathBuf,
    policy: FsyncPolicy,
    buffer_size: usize,
) -> (mpsc::Sender<Mutation>, JournalWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let writer = JournalWriter::new(rx, path, policy);
    (tx, writer)
}
