//! Notification delivery to the desktop bridge.
//!
//! [`NotificationDispatcher`] posts a JSON payload to the configured bridge
//! URL with bounded retry and exponential backoff. Network errors, timeouts,
//! and 5xx responses are retried; 4xx responses are terminal. The dispatcher
//! never touches the entity store.

use std::time::Duration;

use serde::Serialize;

use crate::config::NotificationsConfig;
use crate::error::{MosaicError, Result};

/// Retry schedule for bridge deliveries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep before each retry; indexed by completed attempts - 1.
    pub backoff: Vec<Duration>,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).saturating_sub(1);
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::from_secs(1))
    }
}

/// Outcome of a delivery: whether the bridge accepted it and on which attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub delivered: bool,
    pub attempts: u32,
}

#[derive(Serialize)]
struct BridgePayload<'a> {
    title: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sound: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a serde_json::Value>,
}

pub struct NotificationDispatcher {
    client: reqwest::Client,
    bridge_url: Option<String>,
    enabled: bool,
    default_sound: Option<String>,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        bridge_url: Option<String>,
        enabled: bool,
        default_sound: Option<String>,
        policy: RetryPolicy,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(policy.timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            bridge_url,
            enabled,
            default_sound,
            policy,
        }
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self::new(
            config.bridge_url.clone(),
            config.enabled,
            config.default_sound.clone(),
            RetryPolicy {
                max_attempts: config.max_attempts,
                timeout: Duration::from_secs(config.timeout_secs),
                ..RetryPolicy::default()
            },
        )
    }

    /// Deliver a notification, retrying transient failures per the policy.
    ///
    /// With notifications disabled or no bridge configured, returns a
    /// zero-attempt receipt instead of failing; reminders should not error
    /// out on machines without a bridge.
    pub async fn notify(
        &self,
        title: &str,
        message: &str,
        sound: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<DeliveryReceipt> {
        let url = match (&self.bridge_url, self.enabled) {
            (Some(url), true) => url.as_str(),
            _ => {
                tracing::debug!(title, "notifications disabled, skipping dispatch");
                return Ok(DeliveryReceipt {
                    delivered: false,
                    attempts: 0,
                });
            }
        };

        let payload = BridgePayload {
            title,
            message,
            sound: sound.or(self.default_sound.as_deref()),
            metadata,
        };

        for attempt in 1..=self.policy.max_attempts {
            match self.try_send(url, &payload).await {
                Ok(()) => {
                    tracing::info!(title, attempt, "notification delivered");
                    return Ok(DeliveryReceipt {
                        delivered: true,
                        attempts: attempt,
                    });
                }
                Err(SendError::Permanent(status)) => {
                    tracing::error!(title, status, attempt, "bridge rejected notification");
                    return Err(MosaicError::DeliveryFailed { attempts: attempt });
                }
                Err(SendError::Transient(reason)) => {
                    tracing::warn!(
                        title,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        %reason,
                        "notification attempt failed"
                    );
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay_after(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(
            title,
            attempts = self.policy.max_attempts,
            "notification delivery exhausted retries"
        );
        Err(MosaicError::DeliveryFailed {
            attempts: self.policy.max_attempts,
        })
    }

    async fn try_send(&self, url: &str, payload: &BridgePayload<'_>) -> std::result::Result<(), SendError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| SendError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(SendError::Permanent(status.as_u16()))
        } else {
            Err(SendError::Transient(format!("HTTP {}", status.as_u16())))
        }
    }
}

enum SendError {
    /// Network error, timeout, or 5xx; worth retrying.
    Transient(String),
    /// 4xx: the bridge understood and refused, so retrying cannot help.
    Permanent(u16),
}
