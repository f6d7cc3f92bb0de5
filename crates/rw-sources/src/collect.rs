use std::sync::Arc;
use std::time::Duration;

use rw_config::MonitorConfig;
use rw_engine::{EvaluationInputs, SourceSlot};

use crate::{
    fetch_outcome, read_with_fallback, EnforcementReader, HttpEnforcementReader,
    HttpReserveSource, ReserveSource,
};

/// Everything one polling tick reads from the outside world.
#[derive(Clone)]
pub struct Sources {
    pub primary: Arc<dyn ReserveSource>,
    pub secondary: Option<Arc<dyn ReserveSource>>,
    pub onchain: Arc<dyn EnforcementReader>,
    pub onchain_retries: u32,
    pub onchain_timeout: Duration,
}

impl Sources {
    /// HTTP-backed sources for a monitor config.
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        let http_source = |s: &rw_config::SourceConfig| -> Arc<dyn ReserveSource> {
            Arc::new(HttpReserveSource::new(
                s.id.clone(),
                s.url.clone(),
                s.expected_signer.clone(),
                Duration::from_millis(s.timeout_ms),
            ))
        };
        let onchain_timeout = Duration::from_millis(cfg.onchain.timeout_ms);
        Self {
            primary: http_source(&cfg.sources.primary),
            secondary: cfg.sources.secondary.as_ref().map(http_source),
            onchain: Arc::new(HttpEnforcementReader::new(
                cfg.onchain.url.clone(),
                onchain_timeout,
            )),
            onchain_retries: cfg.onchain.retries,
            onchain_timeout,
        }
    }

    /// Fetch both sources and the enforcement snapshot concurrently.
    ///
    /// Returns only once all three have answered or timed out. The incident
    /// is left empty for the caller to fill in.
    pub async fn collect(&self) -> EvaluationInputs {
        let secondary = async {
            match &self.secondary {
                Some(s) => Some(fetch_outcome(s.as_ref()).await),
                None => None,
            }
        };
        let (primary_outcome, secondary_outcome, snapshot) = tokio::join!(
            fetch_outcome(self.primary.as_ref()),
            secondary,
            read_with_fallback(
                self.onchain.as_ref(),
                self.onchain_retries,
                self.onchain_timeout
            ),
        );

        let slot = |s: &Arc<dyn ReserveSource>, outcome| {
            SourceSlot::new(s.id(), s.expected_signer().map(str::to_string), outcome)
        };

        EvaluationInputs {
            primary: slot(&self.primary, primary_outcome),
            secondary: match (&self.secondary, secondary_outcome) {
                (Some(s), Some(outcome)) => slot(s, outcome),
                _ => SourceSlot::not_configured(),
            },
            snapshot,
            incident: None,
        }
    }
}
