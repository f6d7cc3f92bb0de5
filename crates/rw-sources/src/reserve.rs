use std::time::Duration;

use rw_schemas::{FetchOutcome, RawReservePayload};

use crate::SourceError;

/// One reserve data source.
#[async_trait::async_trait]
pub trait ReserveSource: Send + Sync {
    /// Configured connector id.
    fn id(&self) -> &str;

    fn expected_signer(&self) -> Option<&str>;

    fn timeout(&self) -> Duration;

    async fn fetch(&self) -> Result<RawReservePayload, SourceError>;
}

/// GET `url` -> `{timestamp, reserveUsd, navUsd?, source?, signer?, signature?}`.
#[derive(Debug, Clone)]
pub struct HttpReserveSource {
    id: String,
    url: String,
    expected_signer: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpReserveSource {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        expected_signer: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            expected_signer: expected_signer.filter(|s| !s.trim().is_empty()),
            timeout,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl ReserveSource for HttpReserveSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn expected_signer(&self) -> Option<&str> {
        self.expected_signer.as_deref()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self) -> Result<RawReservePayload, SourceError> {
        let resp = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status.as_u16()));
        }

        resp.json::<RawReservePayload>()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout))
    }
}

/// Fetch under the source's own timeout and fold any failure into a value.
pub async fn fetch_outcome(source: &dyn ReserveSource) -> FetchOutcome {
    let timeout = source.timeout();
    let result = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(r) => r,
        Err(_) => Err(SourceError::Timeout(timeout)),
    };
    match result {
        Ok(payload) => FetchOutcome::fetched(payload),
        Err(e) => {
            tracing::warn!(source = %source.id(), error = %e, "reserve source fetch failed");
            FetchOutcome::failed(e.to_string())
        }
    }
}
