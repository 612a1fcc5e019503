//! Threat intelligence feed collectors

pub mod isight;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::FeedWindow;
use crate::models::{CredentialPair, FeedResponse};

/// Feed-level failures that are not transport errors
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed provider returned {status} {reason}")]
    Status { status: u16, reason: String },
}

/// Trait for feed collectors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedCollector: Send + Sync {
    /// Feed name
    fn name(&self) -> &'static str;

    /// Fetch the raw feed for the window ending at `now`. Any HTTP status is
    /// returned as a response; only transport failures are errors.
    async fn fetch(
        &self,
        credentials: &CredentialPair,
        window: FeedWindow,
        now: DateTime<Utc>,
    ) -> Result<FeedResponse>;
}

/// Reject non-2xx responses so error pages are never archived as data
pub fn ensure_success(response: FeedResponse) -> Result<FeedResponse, FeedError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(FeedError::Status {
            status: response.status,
            reason: response.reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, reason: &str) -> FeedResponse {
        FeedResponse {
            status,
            reason: reason.to_string(),
            body: b"indicator,type\n".to_vec(),
        }
    }

    #[test]
    fn success_passes_through() {
        let ok = ensure_success(response(200, "OK")).unwrap();
        assert_eq!(ok.body, b"indicator,type\n");
    }

    #[test]
    fn error_status_keeps_reason() {
        let err = ensure_success(response(401, "Unauthorized")).unwrap_err();
        assert_eq!(err.to_string(), "feed provider returned 401 Unauthorized");
    }
}
