use std::time::Duration;

use rw_schemas::EnforcementSnapshot;

use crate::SourceError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockTag {
    Finalized,
    Latest,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Finalized => "finalized",
            BlockTag::Latest => "latest",
        }
    }
}

/// Reads decoded on-chain enforcement state at a block tag.
#[async_trait::async_trait]
pub trait EnforcementReader: Send + Sync {
    async fn read_at(&self, tag: BlockTag) -> Result<EnforcementSnapshot, SourceError>;
}

/// GET `url?blockTag=<tag>` -> decoded [`EnforcementSnapshot`] JSON.
///
/// Contract calls and ABI decoding happen behind the endpoint.
#[derive(Debug, Clone)]
pub struct HttpEnforcementReader {
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpEnforcementReader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl EnforcementReader for HttpEnforcementReader {
    async fn read_at(&self, tag: BlockTag) -> Result<EnforcementSnapshot, SourceError> {
        let resp = self
            .http
            .get(&self.url)
            .query(&[("blockTag", tag.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status.as_u16()));
        }

        let mut snapshot: EnforcementSnapshot = resp
            .json()
            .await
            .map_err(|e| SourceError::from_reqwest(e, self.timeout))?;
        if let Some(err) = snapshot.error.take() {
            // Reader answered but reports its own RPC failure.
            return Err(SourceError::Transport(err));
        }
        snapshot.block_tag = Some(tag.as_str().to_string());
        Ok(snapshot)
    }
}

/// `1 + retries` attempts at `finalized`, then one at `latest`.
///
/// Each attempt is bounded by `timeout`. Exhaustion yields an unavailable
/// snapshot carrying the last error.
pub async fn read_with_fallback(
    reader: &dyn EnforcementReader,
    retries: u32,
    timeout: Duration,
) -> EnforcementSnapshot {
    let attempts = std::iter::repeat(BlockTag::Finalized)
        .take(retries as usize + 1)
        .chain(std::iter::once(BlockTag::Latest));

    let mut last_err = SourceError::Transport("no attempt made".to_string());
    for (i, tag) in attempts.enumerate() {
        let result = match tokio::time::timeout(timeout, reader.read_at(tag)).await {
            Ok(r) => r,
            Err(_) => Err(SourceError::Timeout(timeout)),
        };
        match result {
            Ok(snapshot) => {
                if tag == BlockTag::Latest {
                    tracing::warn!("enforcement read fell back to latest block");
                }
                return snapshot;
            }
            Err(e) => {
                tracing::warn!(
                    attempt = i + 1,
                    block_tag = tag.as_str(),
                    error = %e,
                    "enforcement read failed"
                );
                last_err = e;
            }
        }
    }
    EnforcementSnapshot::unavailable(last_err.to_string())
}
