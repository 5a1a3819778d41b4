use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use gavel_common::EntityError;

use crate::auction::AuctionStatus;
use crate::record::AuctionRecord;

/// Escrita aplicada à coleção de leilões. Cada mutação vira uma linha
/// JSON no journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Insert { record: AuctionRecord },
    SetStatus { id: String, status: AuctionStatus },
}

impl Mutation {
    /// Serializa a mutação como uma linha terminada em `\n`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), EntityError> {
        let line = serde_json::to_vec(self).map_err(|e| EntityError::Encoding(e.to_string()))?;
        buf.reserve(line.len() + 1);
        buf.extend_from_slice(&line);
        buf.put_u8(b'\n');
        Ok(())
    }

    /// Consome uma linha completa do buffer. Retorna `None` se ainda não
    /// há `\n` (linha incompleta).
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Mutation>, EntityError> {
        let Some(end) = buf.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };

        let line = buf.split_to(end);
        buf.advance(1);

        serde_json::from_slice(&line)
            .map(Some)
            .map_err(|e| EntityError::Encoding(e.to_string()))
    }

    /// `_id` do documento afetado.
    pub fn id(&self) -> &str {
        match self {
            Mutation::Insert { record } => &record.id,
            Mutation::SetStatus { id, .. } => id,
        }
    }
}
