use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered push recipient. The token value is its own key, so
/// re-registration is an upsert that only refreshes `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PushToken {
    pub token: String,
    pub updated_at: DateTime<Utc>,
}
