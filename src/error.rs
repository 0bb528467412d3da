use std::time::Duration;

use thiserror::Error;

/// Why a probe produced no usable response.
///
/// These never abort a run; they are stored in the result instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("malformed URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    /// Keeps the hops walked before giving up.
    #[error("too many redirects (more than {limit})")]
    TooManyRedirects { limit: usize, hops: Vec<String> },
    #[error("bad redirect location `{0}`")]
    BadLocation(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl ProbeError {
    /// Sort a `reqwest` failure into one of our kinds.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(root_cause(&err))
        } else if err.is_builder() {
            Self::InvalidUrl {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                reason: root_cause(&err),
            }
        } else {
            Self::Request(root_cause(&err))
        }
    }
}

/// `reqwest` wraps hyper and io errors; the innermost one reads best.
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut cause = err;
    while let Some(source) = cause.source() {
        cause = source;
    }
    cause.to_string()
}
