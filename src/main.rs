//! PulseBot - brand social decisioning and publishing backend
//!
//! Inbound: reads social events as JSON lines on stdin, runs each through
//! the decision pipeline and writes the canonical decision output to stdout.
//! Outbound: runs the due-time publishing loop over the configured store.
//! Platform network clients and the HTTP surface live in separate services;
//! this binary wires the core engines with dry-run collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pulsebot_backend::analysis::sentiment::SentimentAnalyzer;
use pulsebot_backend::analysis::topics::TopicEngine;
use pulsebot_backend::clock::SystemClock;
use pulsebot_backend::config::AppConfig;
use pulsebot_backend::decision::engine::DecisionEngine;
use pulsebot_backend::decision::executor::{ActionExecutor, EscalationNotifier, ReplyPublisher};
use pulsebot_backend::error::CoreResult;
use pulsebot_backend::models::{BrandContext, Platform, SocialEvent};
use pulsebot_backend::publishing::manager::{
    ContentValidation, PlatformPublisher, PublishError, PublishOutcome, PublishingManager,
};
use pulsebot_backend::publishing::notifications::{NotificationEnvelope, NotificationSink};
use pulsebot_backend::scheduling::types::ScheduledContent;
use pulsebot_backend::storage::sqlite::SqliteStore;
use pulsebot_backend::storage::DecisionRepository;

#[derive(Parser, Debug)]
#[command(name = "pulsebot", about = "Social decisioning and publishing backend")]
struct Args {
    /// TOML configuration file; defaults + env overrides when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prometheus exporter port
    #[arg(long, default_value_t = 9090)]
    metrics_port: u16,

    /// Brand the inbound events are decided for
    #[arg(long, env = "PULSEBOT_BRAND_ID", default_value = "default-brand")]
    brand: String,

    /// Skip the publishing loop (decision worker only)
    #[arg(long, default_value_t = false)]
    no_publishing: bool,
}

/// Dry-run reply publisher: logs instead of calling platform APIs.
struct DryRunReplyPublisher;

#[async_trait::async_trait]
impl ReplyPublisher for DryRunReplyPublisher {
    async fn publish_reply(
        &self,
        event: &SocialEvent,
        template: &str,
        _parameters: &serde_json::Value,
    ) -> CoreResult<String> {
        info!(
            event_id = %event.id,
            platform = event.platform.as_str(),
            template,
            "dry-run reply"
        );
        Ok(format!("dryrun-{}-{template}", event.id))
    }
}

struct LogEscalationNotifier;

#[async_trait::async_trait]
impl EscalationNotifier for LogEscalationNotifier {
    async fn notify(&self, queue: &str, payload: &serde_json::Value) -> CoreResult<()> {
        info!(queue, %payload, "escalation queued");
        Ok(())
    }
}

/// Dry-run platform publisher for the outbound loop.
struct DryRunPlatformPublisher;

#[async_trait::async_trait]
impl PlatformPublisher for DryRunPlatformPublisher {
    async fn validate_content(
        &self,
        schedule: &ScheduledContent,
        _platform: Platform,
    ) -> ContentValidation {
        let mut issues = Vec::new();
        if schedule.content.trim().is_empty() {
            issues.push("content is empty".to_string());
        }
        ContentValidation {
            valid: issues.is_empty(),
            issues,
        }
    }

    async fn publish_content(
        &self,
        schedule: &ScheduledContent,
        platform: Platform,
    ) -> Result<PublishOutcome, PublishError> {
        info!(
            schedule_id = %schedule.id,
            platform = platform.as_str(),
            "dry-run publish"
        );
        Ok(PublishOutcome {
            platform_post_id: format!("dryrun-{}-{}", platform.as_str(), schedule.id),
            initial_metrics: serde_json::json!({}),
        })
    }
}

struct LogNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send_notification(&self, envelope: &NotificationEnvelope) -> CoreResult<()> {
        info!(
            schedule_id = %envelope.schedule_id,
            kind = envelope.notification_type.as_str(),
            title = %envelope.title,
            "notification"
        );
        Ok(())
    }

    async fn schedule_notification(
        &self,
        envelope: &NotificationEnvelope,
        at: DateTime<Utc>,
    ) -> CoreResult<String> {
        info!(
            schedule_id = %envelope.schedule_id,
            kind = envelope.notification_type.as_str(),
            %at,
            "notification scheduled"
        );
        Ok(format!("log-{}", envelope.schedule_id))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load(path).context("loading configuration file")?,
        None => AppConfig::from_env().context("building configuration from environment")?,
    };

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], args.metrics_port))
        .install()
        .context("installing prometheus exporter")?;
    info!(port = args.metrics_port, "metrics exporter listening");

    let clock = Arc::new(SystemClock);
    let store = Arc::new(
        SqliteStore::open(Path::new(&config.storage.database_path))
            .context("opening sqlite store")?,
    );

    let sentiment = Arc::new(SentimentAnalyzer::new(config.sentiment.clone()));
    let topics = Arc::new(tokio::sync::Mutex::new(TopicEngine::new(
        config.topics.clone(),
        clock.clone(),
        sentiment,
    )));

    let executor = Arc::new(ActionExecutor::new(
        Arc::new(DryRunReplyPublisher),
        Arc::new(LogEscalationNotifier),
    ));
    let engine = Arc::new(
        DecisionEngine::new(config.clone(), clock.clone())
            .with_executor(executor)
            .with_topic_engine(topics)
            .with_audit_repository(store.clone() as Arc<dyn DecisionRepository>),
    );

    let publishing_task = if args.no_publishing {
        None
    } else {
        let manager = Arc::new(PublishingManager::new(
            store.clone(),
            Arc::new(DryRunPlatformPublisher),
            Arc::new(LogNotificationSink),
            config.publishing.clone(),
            clock.clone(),
        ));
        info!(
            tick_seconds = config.publishing.tick_seconds,
            "publishing loop starting"
        );
        Some(tokio::spawn(manager.run_loop()))
    };

    let brand = BrandContext::new(args.brand.clone());
    info!(brand = %brand.brand_id, "decision worker reading events from stdin");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        let event: SocialEvent = match serde_json::from_str(&line) {
                            Ok(event) => event,
                            Err(err) => {
                                warn!(error = %err, "unparseable event line");
                                continue;
                            }
                        };
                        match engine.process(&event, &brand).await {
                            Ok(result) => {
                                println!("{}", serde_json::to_string(&result.output)?);
                            }
                            Err(err) => error!(event_id = %event.id, error = %err, "decision failed"),
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break;
                    }
                    Err(err) => {
                        error!(error = %err, "stdin read failed");
                        break;
                    }
                }
            }
        }
    }

    if let Some(task) = publishing_task {
        task.abort();
    }
    let snapshot = engine.metrics().snapshot();
    info!(
        decisions = snapshot.decisions_total,
        auto = snapshot.auto_responses,
        human = snapshot.human_reviews,
        timeouts = snapshot.timeouts,
        "shutting down"
    );
    Ok(())
}
