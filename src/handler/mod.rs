//! Feed sync handler: one invocation, five sequential stages

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::callback::CallbackReporter;
use crate::collectors::{FeedCollector, ensure_success};
use crate::config::HandlerConfig;
use crate::intel::rotation::upsert_threat_intel_set;
use crate::intel::{ThreatIntelService, resolve_detector};
use crate::models::naming::set_name;
use crate::models::{HandlerResult, InvocationContext, InvocationEvent, ResponseStatus};
use crate::secrets::{SecretStore, resolve_credentials};
use crate::storage::{ArchiveStore, archive_feed};

/// Fetches the feed, archives it and rotates it into the monitoring service
pub struct FeedSyncHandler {
    config: HandlerConfig,
    secrets: Arc<dyn SecretStore>,
    collector: Arc<dyn FeedCollector>,
    archive: Arc<dyn ArchiveStore>,
    intel: Arc<dyn ThreatIntelService>,
    reporter: CallbackReporter,
}

impl FeedSyncHandler {
    pub fn new(
        config: HandlerConfig,
        secrets: Arc<dyn SecretStore>,
        collector: Arc<dyn FeedCollector>,
        archive: Arc<dyn ArchiveStore>,
        intel: Arc<dyn ThreatIntelService>,
        reporter: CallbackReporter,
    ) -> Self {
        Self {
            config,
            secrets,
            collector,
            archive,
            intel,
            reporter,
        }
    }

    /// Run one invocation. Always produces a result payload; failures are
    /// folded into a `500` and reported as `FAILED`.
    pub async fn handle(&self, event: &InvocationEvent, context: &InvocationContext) -> HandlerResult {
        self.handle_at(event, context, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        event: &InvocationEvent,
        context: &InvocationContext,
        now: DateTime<Utc>,
    ) -> HandlerResult {
        tracing::info!(
            request_type = event.request_type.as_deref().unwrap_or_default(),
            invocation = %context.request_id,
            "Invocation received"
        );

        if event.is_delete() {
            tracing::info!("Delete request, nothing to tear down");
            self.reporter
                .report(event, context, ResponseStatus::Success, None)
                .await;
            return HandlerResult::success("success");
        }

        match self.sync(now).await {
            Ok(result) => {
                self.reporter
                    .report(event, context, ResponseStatus::Success, None)
                    .await;
                result
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, "Feed sync failed");
                self.reporter
                    .report(event, context, ResponseStatus::Failed, Some(message.clone()))
                    .await;
                HandlerResult::failure(message)
            }
        }
    }

    async fn sync(&self, now: DateTime<Utc>) -> Result<HandlerResult> {
        let settings = self.config.validate().context("Invalid configuration")?;
        let window = settings.window;

        let credentials = resolve_credentials(
            self.secrets.as_ref(),
            settings.public_key_param,
            settings.private_key_param,
        )
        .await
        .context("Failed to resolve provider credentials")?;

        let response = self
            .collector
            .fetch(&credentials, window, now)
            .await
            .with_context(|| format!("Failed to fetch {} feed", self.collector.name()))?;
        drop(credentials);

        tracing::info!(
            feed = self.collector.name(),
            status = response.status,
            reason = %response.reason,
            "Feed fetched"
        );
        let response = ensure_success(response)?;

        let archived = archive_feed(
            self.archive.as_ref(),
            settings.output_bucket,
            settings.archive_prefix,
            window,
            now,
            response.body,
        )
        .await
        .context("Failed to archive feed")?;

        let detector_id = resolve_detector(self.intel.as_ref()).await?;
        let name = set_name(now);

        let outcome = upsert_threat_intel_set(
            self.intel.as_ref(),
            &detector_id,
            &name,
            &archived.location,
        )
        .await
        .with_context(|| format!("Failed to register threat intel set {}", name))?;

        tracing::info!(
            detector_id = %detector_id,
            set_id = outcome.set_id(),
            name = %name,
            bucket = %archived.bucket,
            key = %archived.key,
            outcome = ?outcome,
            "Threat intel set is current"
        );

        Ok(HandlerResult::success(format!(
            "You requested: {} day(s) of /view/iocs indicators in CSV",
            window
        )))
    }
}
