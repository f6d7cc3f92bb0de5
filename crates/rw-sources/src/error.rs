use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Timeout(Duration),
    /// Connection / request failure.
    Transport(String),
    HttpStatus(u16),
    /// Body was not the expected JSON shape.
    Decode(String),
}

impl SourceError {
    pub(crate) fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(timeout)
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
            SourceError::Transport(e) => write!(f, "request failed: {e}"),
            SourceError::HttpStatus(s) => write!(f, "http status {s}"),
            SourceError::Decode(e) => write!(f, "response decode failed: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}
