//! Network-origin change alerts.
//!
//! Rotation hands an `OriginAlert` to the `NotificationDispatcher` and moves
//! on. A background worker drains the bounded queue and delivers each alert
//! as its own task, at most `notify_workers` at a time, each under
//! `notify_timeout`. Failed deliveries are logged and dropped; nothing is
//! retried and nothing flows back to the rotation that raised the alert.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        Semaphore,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::{config::SessionConfig, error::NotificationError};
use crate::APP_USER_AGENT;

/// Webhook payload for a rotation from a new network origin.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct OriginAlert {
    pub user_id: Uuid,
    pub ip: String,
    pub new_ip: String,
    pub user_agent: String,
    /// RFC 3339, UTC, second precision.
    pub timestamp: String,
}

impl OriginAlert {
    #[must_use]
    pub fn new(user_id: Uuid, ip: String, new_ip: String, user_agent: String) -> Self {
        Self {
            user_id,
            ip,
            new_ip,
            user_agent,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Delivery abstraction used by the dispatcher worker.
#[async_trait]
pub trait AnomalyNotifier: Send + Sync {
    /// Deliver one alert, or return an error to have it logged and dropped.
    async fn notify(&self, alert: &OriginAlert) -> Result<(), NotificationError>;
}

/// Posts alerts as JSON to the configured webhook.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.notify_timeout())
            .build()?;
        Ok(Self {
            client,
            url: config.webhook_url().clone(),
        })
    }
}

#[async_trait]
impl AnomalyNotifier for WebhookNotifier {
    async fn notify(&self, alert: &OriginAlert) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(alert)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status(status));
        }

        info!(user_id = %alert.user_id, %status, "origin alert webhook sent");
        Ok(())
    }
}

/// Fire-and-forget handle to the alert queue.
#[derive(Clone, Debug)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<OriginAlert>,
}

impl NotificationDispatcher {
    /// Create the queue and spawn its worker on the current runtime.
    pub fn spawn(
        notifier: Arc<dyn AnomalyNotifier>,
        config: &SessionConfig,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.notify_queue());
        let handle = tokio::spawn(run_worker(
            rx,
            notifier,
            config.notify_timeout(),
            config.notify_workers(),
        ));
        (Self { tx }, handle)
    }

    /// Queue an alert without waiting. A full or closed queue drops it.
    pub fn enqueue(&self, alert: OriginAlert) {
        match self.tx.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(alert)) => {
                warn!(user_id = %alert.user_id, "origin alert queue full, alert dropped");
            }
            Err(TrySendError::Closed(alert)) => {
                warn!(user_id = %alert.user_id, "origin alert worker stopped, alert dropped");
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<OriginAlert>,
    notifier: Arc<dyn AnomalyNotifier>,
    timeout: Duration,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers.max(1)));

    while let Some(alert) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let notifier = notifier.clone();

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(err) = deliver(notifier.as_ref(), &alert, timeout).await {
                error!(user_id = %alert.user_id, "failed to send origin alert: {err}");
            }
        });
    }

    debug!("origin alert worker stopped");
}

async fn deliver(
    notifier: &dyn AnomalyNotifier,
    alert: &OriginAlert,
    timeout: Duration,
) -> Result<(), NotificationError> {
    tokio::time::timeout(timeout, notifier.notify(alert))
        .await
        .map_err(|_| NotificationError::Timeout(timeout))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::testing::{test_config, RecordingNotifier};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use tokio::{net::TcpListener, sync::mpsc::unbounded_channel};

    fn alert() -> OriginAlert {
        OriginAlert::new(
            Uuid::new_v4(),
            "10.0.0.1".to_string(),
            "10.0.0.2".to_string(),
            "agent/1.0".to_string(),
        )
    }

    #[test]
    fn alert_serializes_with_webhook_field_names() {
        let alert = alert();
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["user_id"], alert.user_id.to_string());
        assert_eq!(value["ip"], "10.0.0.1");
        assert_eq!(value["new_ip"], "10.0.0.2");
        assert_eq!(value["user_agent"], "agent/1.0");
        assert!(alert.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&alert.timestamp).is_ok());
    }

    #[tokio::test]
    async fn dispatcher_delivers_queued_alerts() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (dispatcher, _worker) = NotificationDispatcher::spawn(notifier.clone(), &test_config());

        dispatcher.enqueue(alert());
        dispatcher.enqueue(alert());

        assert_eq!(notifier.wait_for(2).await.len(), 2);
    }

    #[tokio::test]
    async fn slow_notifier_times_out() {
        let notifier = RecordingNotifier::stalled();
        let result = deliver(&notifier, &alert(), Duration::from_millis(20)).await;
        assert!(matches!(result, Err(NotificationError::Timeout(_))));
    }

    #[tokio::test]
    async fn enqueue_after_worker_stops_does_not_block() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let dispatcher = NotificationDispatcher { tx };
        dispatcher.enqueue(alert());
        dispatcher.enqueue(alert());
    }

    #[tokio::test]
    async fn webhook_notifier_posts_json() {
        let (seen_tx, mut seen_rx) = unbounded_channel();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(body);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let config = test_config_with_webhook(&format!("http://{addr}/hook"));
        let notifier = WebhookNotifier::new(&config).unwrap();
        let alert = alert();
        notifier.notify(&alert).await.unwrap();

        let body = seen_rx.recv().await.unwrap();
        assert_eq!(body["new_ip"], "10.0.0.2");
        assert_eq!(body["user_id"], alert.user_id.to_string());
    }

    #[tokio::test]
    async fn webhook_error_status_is_an_error() {
        let app = Router::new().route("/hook", post(|| async { StatusCode::BAD_GATEWAY }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let config = test_config_with_webhook(&format!("http://{addr}/hook"));
        let notifier = WebhookNotifier::new(&config).unwrap();
        assert!(matches!(
            notifier.notify(&alert()).await,
            Err(NotificationError::Status(status)) if status == StatusCode::BAD_GATEWAY
        ));
    }

    fn test_config_with_webhook(url: &str) -> SessionConfig {
        SessionConfig::new(
            Duration::from_secs(60),
            secrecy::SecretString::from("secret"),
            Url::parse(url).unwrap(),
        )
    }
}
