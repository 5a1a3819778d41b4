use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

/// Expiração agendada e ainda não disparada.
#[derive(Debug, Clone)]
pub struct PendingExpiry {
    pub end_time: OffsetDateTime,
    pub cancel: CancellationToken,
}

/// Mapa `auction_id -> fim` das expirações pendentes.
///
/// O lock só é segurado dentro de cada método; nenhum chamador consegue
/// mantê-lo durante a espera ou uma chamada ao store.
#[derive(Debug, Default)]
pub struct ExpiryRegistry {
    entries: Mutex<HashMap<String, PendingExpiry>>,
}

impl ExpiryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingExpiry>> {
        // Nenhuma seção crítica pode deixar o mapa inconsistente.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insere ou sobrescreve a entrada. Retorna a anterior, se havia.
    pub fn register(
        &self,
        id: impl Into<String>,
        end_time: OffsetDateTime,
        cancel: CancellationToken,
    ) -> Option<PendingExpiry> {
        self.lock()
            .insert(id.into(), PendingExpiry { end_time, cancel })
    }

    /// Insere só se não existir entrada para `id`.
    pub fn try_register(&self, id: &str, end_time: OffsetDateTime, cancel: CancellationToken) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(id) {
            return false;
        }
        entries.insert(id.to_string(), PendingExpiry { end_time, cancel });
        true
    }

    /// Remove a entrada; no-op se ausente.
    pub fn unregister(&self, id: &str) -> Option<PendingExpiry> {
        self.lock().remove(id)
    }

    /// Sinaliza o cancelamento da expiração de `id`. A entrada é removida
    /// pela própria tarefa ao acordar.
    pub fn cancel(&self, id: &str) -> bool {
        match self.lock().get(id) {
            Some(pending) => {
                pending.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn end_time(&self, id: &str) -> Option<OffsetDateTime> {
        self.lock().get(id).map(|pending| pending.end_time)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cópia das entradas, ordenada por fim. O lock é liberado antes do
    /// retorno.
    pub fn snapshot(&self) -> Vec<(String, OffsetDateTime)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, pending)| (id.clone(), pending.end_time))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}
