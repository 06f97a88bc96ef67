//! # Monitoring Module
//!
//! Fire-and-forget event and exception reporting. Every event is logged
//! through `tracing`; when a Rollbar token is configured it is also posted to
//! the Rollbar item API from a background task.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::MonitoringConfig;

pub const ROLLBAR_ITEM_URL: &str = "https://api.rollbar.com/api/1/item/";
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity of a reported event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// Sink for operational events
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Report a plain message
    fn report_message(&self, message: &str, level: Level);

    /// Report an error with the chain of causes
    fn report_error(&self, error: &anyhow::Error, context: &str);

    /// Wait for reports still in flight
    async fn flush(&self) {}
}

/// Rollbar reporter; degrades to logging only without a token
pub struct RollbarMonitor {
    token: Option<String>,
    environment: String,
    client: reqwest::Client,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl RollbarMonitor {
    pub fn new(config: &MonitoringConfig) -> Self {
        if config.rollbar_token.is_none() {
            warn!("rollbar_token not set, monitoring events will only be logged");
        }

        Self {
            token: config.rollbar_token.clone(),
            environment: config.rollbar_env.clone(),
            client: reqwest::Client::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn send(&self, body: ItemBody, level: Level) {
        let Some(token) = self.token.as_deref() else {
            return;
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, dropping monitoring event");
                return;
            }
        };

        let payload = build_payload(token, &self.environment, level, body);
        let client = self.client.clone();
        let task = handle.spawn(async move {
            match client.post(ROLLBAR_ITEM_URL).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(status = %response.status(), "Monitoring event delivered");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "Monitoring service rejected event");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to deliver monitoring event");
                }
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|task| !task.is_finished());
            pending.push(task);
        }
    }
}

#[async_trait]
impl Monitor for RollbarMonitor {
    fn report_message(&self, message: &str, level: Level) {
        match level {
            Level::Info => info!(level = level.as_str(), "{message}"),
            Level::Warning => warn!(level = level.as_str(), "{message}"),
            Level::Error => error!(level = level.as_str(), "{message}"),
        }
        self.send(message_body(message), level);
    }

    fn report_error(&self, error: &anyhow::Error, context: &str) {
        error!(error = %format!("{error:#}"), context = %context, "Reporting exception");
        self.send(error_body(error, context), Level::Error);
    }

    async fn flush(&self) {
        let tasks = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };

        for task in tasks {
            if tokio::time::timeout(FLUSH_TIMEOUT, task).await.is_err() {
                warn!("Timed out waiting for a monitoring event to be delivered");
            }
        }
    }
}

/// Rollbar item envelope
#[derive(Debug, Serialize)]
pub struct RollbarItem {
    pub access_token: String,
    pub data: ItemData,
}

#[derive(Debug, Serialize)]
pub struct ItemData {
    pub environment: String,
    pub level: Level,
    pub timestamp: i64,
    pub platform: &'static str,
    pub language: &'static str,
    pub notifier: Notifier,
    pub body: ItemBody,
}

#[derive(Debug, Serialize)]
pub struct Notifier {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ItemBody {
    pub message: MessageBody,
}

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub body: String,
    /// Causes of a reported error, outermost first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

fn message_body(message: &str) -> ItemBody {
    ItemBody {
        message: MessageBody {
            body: message.to_string(),
            causes: Vec::new(),
        },
    }
}

fn error_body(error: &anyhow::Error, context: &str) -> ItemBody {
    ItemBody {
        message: MessageBody {
            body: format!("{context}: {error}"),
            causes: error.chain().skip(1).map(|cause| cause.to_string()).collect(),
        },
    }
}

/// Assemble a Rollbar item
pub fn build_payload(
    token: &str,
    environment: &str,
    level: Level,
    body: ItemBody,
) -> RollbarItem {
    RollbarItem {
        access_token: token.to_string(),
        data: ItemData {
            environment: environment.to_string(),
            level,
            timestamp: chrono::Utc::now().timestamp(),
            platform: std::env::consts::OS,
            language: "rust",
            notifier: Notifier {
                name: env!("CARGO_PKG_NAME"),
                version: env!("CARGO_PKG_VERSION"),
            },
            body,
        },
    }
}
