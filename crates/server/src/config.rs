use std::time::Duration;

use tracing::debug;

use gavel_common::{DEFAULT_AUCTION_DURATION, STORE_TIMEOUT};

/// Converte a string de duração configurada ("30s", "2h", "1m30s", "1.5h",
/// "2 hours"). Ausente, vazia, negativa ou sem unidade cai no padrão de
/// 30s; nunca falha.
pub fn resolve_duration(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_AUCTION_DURATION;
    };

    match humantime::parse_duration(raw) {
        Ok(duration) => {
            debug!("duração dos leilões: {duration:?}");
            duration
        }
        Err(e) => {
            debug!("duração '{raw}' inválida ({e}), usando {DEFAULT_AUCTION_DURATION:?}");
            DEFAULT_AUCTION_DURATION
        }
    }
}

/// Parâmetros do scheduler, resolvidos uma vez no startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub auction_duration: Duration,
    pub insert_timeout: Duration,
    pub close_timeout: Duration,
}

impl SchedulerConfig {
    pub fn with_duration(auction_duration: Duration) -> Self {
        Self {
            auction_duration,
            ..Self::default()
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auction_duration: DEFAULT_AUCTION_DURATION,
            insert_timeout: STORE_TIMEOUT,
            close_timeout: STORE_TIMEOUT,
        }
    }
}
