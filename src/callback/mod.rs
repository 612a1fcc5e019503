//! Completion reports for CloudFormation custom resource invocations

use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use std::time::Duration;

use crate::models::{CallbackReport, InvocationContext, InvocationEvent, ResponseStatus};

/// Sends the invocation outcome to `ResponseURL`
pub struct CallbackReporter {
    client: Client,
}

impl CallbackReporter {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Build the report body. Without an explicit reason the report points
    /// at this invocation's CloudWatch log stream.
    pub fn build_report(
        event: &InvocationEvent,
        context: &InvocationContext,
        status: ResponseStatus,
        reason: Option<String>,
    ) -> CallbackReport {
        CallbackReport {
            status,
            reason: reason.unwrap_or_else(|| {
                format!("See the details in CloudWatch Logs: {}", context.logs_url())
            }),
            physical_resource_id: event.logical_resource_id.clone(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data: json!({}),
        }
    }

    /// Report to the caller if it asked for it. Never fails: transport and
    /// HTTP errors are logged and dropped.
    pub async fn report(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
        status: ResponseStatus,
        reason: Option<String>,
    ) {
        let Some(url) = event.response_url.as_deref() else {
            return;
        };

        let report = Self::build_report(event, context, status, reason);
        if let Err(e) = self.send(url, &report).await {
            tracing::error!(error = %format!("{:#}", e), status = %status, "Failed to send callback report");
        }
    }

    async fn send(&self, url: &str, report: &CallbackReport) -> Result<()> {
        let url = url::Url::parse(url).context("Invalid ResponseURL")?;
        let body = serde_json::to_string(report).context("Failed to encode callback report")?;

        tracing::debug!(body = %body, "Sending callback report");

        // ResponseURL is pre-signed with an empty content type
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .await
            .context("Callback PUT failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Callback endpoint returned {} - {}", status, body);
        }

        tracing::debug!(status = %response.status(), "Callback report delivered");
        Ok(())
    }
}
