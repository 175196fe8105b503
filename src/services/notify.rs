use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{db::DbPool, models::push_token::PushToken};

/// What became of one notification fan-out. Failures are observable here
/// but never fatal to the trip workflow that triggered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Sent { recipients: usize },
    NoRecipients,
    Failed(String),
}

/// Best-effort push fan-out. Implementations must never propagate an error
/// to the caller; a lost notification must not block a trip write.
#[async_trait]
pub trait PushDispatcher: Send + Sync {
    async fn notify_new_trip(&self, title: &str, destination: &str) -> PushOutcome;
    /// Upsert keyed on the token value itself; re-registration only
    /// refreshes the timestamp.
    async fn register_token(&self, token: &str);
}

/// Expo-style push message, one per registered device.
#[derive(Debug, Serialize)]
struct PushMessage {
    to: String,
    sound: &'static str,
    title: String,
    body: String,
    data: serde_json::Value,
}

#[derive(Clone)]
pub struct ExpoDispatcher {
    pool: DbPool,
    client: Client,
    gateway_url: String,
}

impl ExpoDispatcher {
    pub fn new(pool: DbPool, gateway_url: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            gateway_url,
        }
    }

    async fn registered_tokens(&self) -> Result<Vec<PushToken>, sqlx::Error> {
        sqlx::query_as("SELECT token, updated_at FROM push_tokens")
            .fetch_all(&self.pool)
            .await
    }

    async fn send_batch(&self, messages: &[PushMessage]) -> Result<(), String> {
        let response = self
            .client
            .post(&self.gateway_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(messages)
            .send()
            .await
            .map_err(|err| format!("push gateway unreachable: {err}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("push gateway answered {status}"));
        }

        // Nothing in the reply is acted on, it only has to parse.
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| format!("push gateway reply unreadable: {err}"))?;
        debug!(%body, "push gateway reply");
        Ok(())
    }
}

#[async_trait]
impl PushDispatcher for ExpoDispatcher {
    async fn notify_new_trip(&self, title: &str, destination: &str) -> PushOutcome {
        let tokens = match self.registered_tokens().await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("could not load push tokens: {err}");
                return PushOutcome::Failed(format!("token lookup failed: {err}"));
            }
        };

        if tokens.is_empty() {
            debug!("no devices registered, skipping push fan-out");
            return PushOutcome::NoRecipients;
        }

        let messages: Vec<PushMessage> = tokens
            .into_iter()
            .map(|device| PushMessage {
                to: device.token,
                sound: "default",
                title: "New trip available! ✈️".to_string(),
                body: format!("{title} to {destination} has just been added. Check it out!"),
                data: serde_json::json!({ "url": "/trips" }),
            })
            .collect();

        match self.send_batch(&messages).await {
            Ok(()) => {
                info!(recipients = messages.len(), "push notifications sent");
                PushOutcome::Sent {
                    recipients: messages.len(),
                }
            }
            Err(reason) => {
                warn!("push fan-out failed: {reason}");
                PushOutcome::Failed(reason)
            }
        }
    }

    async fn register_token(&self, token: &str) {
        let result = sqlx::query(
            "INSERT INTO push_tokens (token, updated_at) VALUES (?1, ?2) \
             ON CONFLICT(token) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(token)
        .bind(Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => debug!("push token registered"),
            Err(err) => warn!("could not store push token: {err}"),
        }
    }
}
