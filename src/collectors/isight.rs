//! iSIGHT indicator feed collector

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use reqwest::StatusCode;
use std::time::Duration;

use crate::collectors::FeedCollector;
use crate::config::{FeedWindow, parse_api_url};
use crate::models::{CredentialPair, FeedResponse};

type HmacSha256 = Hmac<Sha256>;

const QUERY_PATH: &str = "/view/iocs";
const ACCEPT: &str = "text/csv";
const API_VERSION: &str = "2.6";
const APP_NAME: &str = "mysight-api";

/// Collector for the iSIGHT `/view/iocs` CSV export
pub struct IsightCollector {
    client: Client,
    /// Checked on every fetch so a bad value fails the invocation only
    base_url: String,
}

impl IsightCollector {
    /// Create a new iSIGHT collector
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Path and query for a window, exactly as it is signed
    pub fn query_path(window: FeedWindow, now: DateTime<Utc>) -> String {
        let (start, end) = window.range(now);
        format!("{}?startDate={}&endDate={}&format=csv", QUERY_PATH, start, end)
    }
}

/// Reason phrase reported for a status. reqwest does not expose the phrase sent
/// on the wire, so this is the registered phrase, empty for unregistered
/// codes.
pub fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// Hex HMAC-SHA256 over `path + version + accept + date`, keyed with the
/// private key
pub fn sign_request(private_key: &str, path_and_query: &str, date: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(private_key.as_bytes())
        .map_err(|_| anyhow::anyhow!("Invalid iSIGHT private key"))?;

    mac.update(path_and_query.as_bytes());
    mac.update(API_VERSION.as_bytes());
    mac.update(ACCEPT.as_bytes());
    mac.update(date.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl FeedCollector for IsightCollector {
    fn name(&self) -> &'static str {
        "isight"
    }

    async fn fetch(
        &self,
        credentials: &CredentialPair,
        window: FeedWindow,
        now: DateTime<Utc>,
    ) -> Result<FeedResponse> {
        let path_and_query = Self::query_path(window, now);
        let date = now.to_rfc2822();
        let signature = sign_request(&credentials.private_key, &path_and_query, &date)?;

        let url = parse_api_url(&self.base_url)?
            .join(&path_and_query)
            .context("Failed to build iSIGHT query URL")?;

        tracing::debug!(url = %url, days = window.days(), "Requesting iSIGHT indicators");

        let response = self
            .client
            .get(url)
            .header("Accept", ACCEPT)
            .header("Accept-Version", API_VERSION)
            .header("X-Auth", &credentials.public_key)
            .header("X-Auth-Hash", signature)
            .header("X-App-Name", APP_NAME)
            .header("Date", date)
            .send()
            .await
            .context("Failed to fetch iSIGHT indicators")?;

        let status = response.status();
        let reason = reason_phrase(status);
        let body = response
            .bytes()
            .await
            .context("Failed to read iSIGHT response body")?
            .to_vec();

        tracing::info!(
            status = status.as_u16(),
            reason = %reason,
            bytes = body.len(),
            "iSIGHT responded"
        );

        Ok(FeedResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}
