use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{dedup_items, derive_days, Trip, TripInput, TripPatch},
};

/// Record-store side of the trip lifecycle. Implementations own the query
/// shape; callers only see domain values.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// All trips, newest first. Empty vec when the backend has no rows.
    async fn list(&self) -> Result<Vec<Trip>, AppError>;
    /// Unknown ids are `None`, not an error.
    async fn get(&self, id: &str) -> Result<Option<Trip>, AppError>;
    /// The store assigns `id` and `created_at`. Images start out empty;
    /// they are linked in a follow-up update once uploaded.
    async fn insert(&self, input: TripInput) -> Result<Trip, AppError>;
    /// Merges only the supplied fields; errors when the row is gone.
    async fn update(&self, id: &str, patch: TripPatch) -> Result<Trip, AppError>;
    /// Does not distinguish "already gone" from "never existed".
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct SqliteTripStore {
    pool: DbPool,
}

/// Raw row shape; list-valued columns are JSON text in SQLite.
#[derive(Debug, FromRow)]
struct TripRow {
    id: String,
    title: String,
    destination: String,
    description: Option<String>,
    price: f64,
    saved: bool,
    date_range: String,
    days: i64,
    included_items: String,
    images: String,
    created_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            title: row.title,
            destination: row.destination,
            description: row.description,
            price: row.price,
            saved: row.saved,
            date_range: row.date_range,
            days: row.days,
            // A corrupt column degrades to the empty list the consumers expect.
            included_items: serde_json::from_str(&row.included_items).unwrap_or_default(),
            images: serde_json::from_str(&row.images).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str =
    "id, title, destination, description, price, saved, date_range, days, included_items, images, created_at";

impl SqliteTripStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    async fn list(&self) -> Result<Vec<Trip>, AppError> {
        let rows: Vec<TripRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM trips ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Trip>, AppError> {
        let row: Option<TripRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM trips WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Trip::from))
    }

    async fn insert(&self, input: TripInput) -> Result<Trip, AppError> {
        input.validate()?;
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let days = input.resolved_days();
        let included =
            serde_json::to_string(&dedup_items(input.included_items)).map_err(anyhow::Error::from)?;

        let row: TripRow = sqlx::query_as(&format!(
            "INSERT INTO trips ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             RETURNING {COLUMNS}"
        ))
        .bind(&id)
        .bind(&input.title)
        .bind(&input.destination)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.saved)
        .bind(&input.date_range)
        .bind(days)
        .bind(&included)
        .bind("[]")
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update(&self, id: &str, patch: TripPatch) -> Result<Trip, AppError> {
        // Read-merge-write: the patch carries only the fields the caller
        // supplied, everything else keeps its stored value.
        let current = self.get(id).await?.ok_or(sqlx::Error::RowNotFound)?;

        // A patched date range without an explicit day count re-derives it,
        // keeping `days` consistent with the stored range.
        let days = match (patch.days, patch.date_range.as_deref()) {
            (Some(days), _) => days,
            (None, Some(range)) => derive_days(range).unwrap_or(current.days),
            (None, None) => current.days,
        };

        let included = dedup_items(patch.included_items.unwrap_or(current.included_items));
        let images = patch.images.unwrap_or(current.images);
        let included_json = serde_json::to_string(&included).map_err(anyhow::Error::from)?;
        let images_json = serde_json::to_string(&images).map_err(anyhow::Error::from)?;

        let row: TripRow = sqlx::query_as(&format!(
            "UPDATE trips SET title = ?1, destination = ?2, description = ?3, price = ?4, \
             saved = ?5, date_range = ?6, days = ?7, included_items = ?8, images = ?9 \
             WHERE id = ?10 RETURNING {COLUMNS}"
        ))
        .bind(patch.title.unwrap_or(current.title))
        .bind(patch.destination.unwrap_or(current.destination))
        .bind(patch.description.or(current.description))
        .bind(patch.price.unwrap_or(current.price))
        .bind(patch.saved.unwrap_or(current.saved))
        .bind(patch.date_range.unwrap_or(current.date_range))
        .bind(days)
        .bind(&included_json)
        .bind(&images_json)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    // One connection, or every pool checkout would see its own empty
    // in-memory database.
    async fn memory_store() -> SqliteTripStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("connect in-memory sqlite");
        sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
        SqliteTripStore::new(pool)
    }

    fn input() -> TripInput {
        TripInput {
            title: "Beach week".into(),
            destination: "Natal".into(),
            description: None,
            price: 1200.0,
            saved: false,
            date_range: "01/01/2025 - 05/01/2025".into(),
            days: None,
            included_items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn patched_date_range_rederives_days() {
        let store = memory_store().await;
        let trip = store.insert(input()).await.expect("insert");
        assert_eq!(trip.days, 4);

        let updated = store
            .update(
                &trip.id,
                TripPatch {
                    date_range: Some("01/01/2025 - 11/01/2025".into()),
                    ..TripPatch::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.date_range, "01/01/2025 - 11/01/2025");
        assert_eq!(updated.days, 10);
    }

    #[tokio::test]
    async fn explicit_days_in_patch_win_over_derivation() {
        let store = memory_store().await;
        let trip = store.insert(input()).await.expect("insert");

        let updated = store
            .update(
                &trip.id,
                TripPatch {
                    date_range: Some("01/01/2025 - 11/01/2025".into()),
                    days: Some(3),
                    ..TripPatch::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.days, 3);
    }

    #[tokio::test]
    async fn unparseable_patched_range_keeps_stored_days() {
        let store = memory_store().await;
        let trip = store.insert(input()).await.expect("insert");

        let updated = store
            .update(
                &trip.id,
                TripPatch {
                    date_range: Some("sometime next year".into()),
                    ..TripPatch::default()
                },
            )
            .await
            .expect("update");

        assert_eq!(updated.days, trip.days);
    }
}
