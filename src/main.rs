//! iSIGHT → GuardDuty sync
//!
//! Pulls the iSIGHT indicator feed, archives it to S3 and keeps a daily
//! GuardDuty threat intel set pointed at the newest archive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use lambda_runtime::{LambdaEvent, service_fn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod callback;
mod collectors;
mod config;
mod handler;
mod intel;
mod models;
mod secrets;
mod storage;

use callback::CallbackReporter;
use collectors::isight::IsightCollector;
use config::{DEFAULT_API_URL, DEFAULT_ARCHIVE_PREFIX, HandlerConfig, LogLevel};
use handler::FeedSyncHandler;
use intel::guardduty::GuardDutyService;
use models::{HandlerResult, InvocationContext, InvocationEvent};
use secrets::SsmSecretStore;
use storage::S3ArchiveStore;

/// iSIGHT → GuardDuty sync
#[derive(Parser, Debug)]
#[command(name = "isight-guardduty-sync")]
#[command(about = "Archive the iSIGHT feed to S3 and rotate it into GuardDuty")]
struct Args {
    /// DEBUG, INFO, WARNING, ERROR or CRITICAL; anything else means ERROR
    #[arg(long, env = "LOG_LEVEL", default_value = "ERROR")]
    log_level: String,

    // Required settings stay optional here and are checked per invocation

    /// Trailing days of indicators to request
    #[arg(long, env = "DAYS_REQUESTED", allow_hyphen_values = true)]
    days_requested: Option<String>,

    /// SSM parameter holding the iSIGHT public key
    #[arg(long, env = "PUBLIC_KEY")]
    public_key: Option<String>,

    /// SSM parameter holding the iSIGHT private key
    #[arg(long, env = "PRIVATE_KEY")]
    private_key: Option<String>,

    /// Bucket receiving archived feeds
    #[arg(long, env = "OUTPUT_BUCKET")]
    output_bucket: Option<String>,

    /// iSIGHT API base URL
    #[arg(long, env = "ISIGHT_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Key prefix for archived feeds
    #[arg(long, env = "ARCHIVE_PREFIX", default_value = DEFAULT_ARCHIVE_PREFIX)]
    archive_prefix: String,

    /// Run a single invocation with this JSON event instead of serving the
    /// Lambda runtime API
    #[arg(long)]
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse arguments
    let args = Args::parse();
    let log_level = LogLevel::parse_lossy(&args.log_level);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::default().add_directive(log_level.as_filter().into())
            }),
        )
        .with(tracing_subscriber::fmt::layer().json().without_time())
        .init();

    tracing::info!(log_level = %log_level, "Starting iSIGHT sync");

    let config = HandlerConfig {
        days_requested: args.days_requested,
        public_key_param: args.public_key,
        private_key_param: args.private_key,
        output_bucket: args.output_bucket,
        archive_prefix: args.archive_prefix,
    };
    if let Err(e) = config.validate() {
        tracing::warn!(error = %e, "Configuration is incomplete, sync invocations will fail");
    }

    // AWS clients
    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;

    let handler = FeedSyncHandler::new(
        config,
        Arc::new(SsmSecretStore::new(aws_sdk_ssm::Client::new(&aws))),
        Arc::new(IsightCollector::new(args.api_url)?),
        Arc::new(S3ArchiveStore::new(aws_sdk_s3::Client::new(&aws))),
        Arc::new(GuardDutyService::new(aws_sdk_guardduty::Client::new(&aws))),
        CallbackReporter::new()?,
    );

    if let Some(path) = args.event {
        let result = run_local(&handler, &path).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let handler = &handler;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<InvocationEvent>| async move {
        let context = invocation_context(&event.context);
        Ok::<HandlerResult, lambda_runtime::Error>(handler.handle(&event.payload, &context).await)
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda runtime failed: {}", e))?;

    Ok(())
}

fn invocation_context(context: &lambda_runtime::Context) -> InvocationContext {
    InvocationContext {
        request_id: context.request_id.clone(),
        function_arn: context.invoked_function_arn.clone(),
        log_group: context.env_config.log_group.clone(),
        log_stream: context.env_config.log_stream.clone(),
    }
}

async fn run_local(handler: &FeedSyncHandler, path: &Path) -> Result<HandlerResult> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    let event: InvocationEvent =
        serde_json::from_str(&raw).context("Failed to parse event file")?;

    let context = InvocationContext {
        request_id: "local".to_string(),
        ..Default::default()
    };

    let result = handler.handle(&event, &context).await;
    if !result.is_success() {
        tracing::warn!(message = %result.body.message, "Local invocation failed");
    }
    Ok(result)
}
