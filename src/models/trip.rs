use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A bookable travel package as stored in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub title: String,
    pub destination: String,
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub saved: bool,
    pub date_range: String,
    pub days: i64,
    #[serde(default)]
    pub included_items: Vec<String>,
    /// Public object-store URLs, insertion order is display order
    /// (index 0 is the cover image). Never null, normalizes to empty.
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Creation payload. `id` and `created_at` are assigned by the record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TripInput {
    pub title: String,
    pub destination: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub saved: bool,
    pub date_range: String,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub included_items: Vec<String>,
}

impl TripInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".into()));
        }
        if self.destination.trim().is_empty() {
            return Err(AppError::BadRequest("destination must not be empty".into()));
        }
        if self.price < 0.0 {
            return Err(AppError::BadRequest("price must not be negative".into()));
        }
        Ok(())
    }

    /// Explicit day count if supplied, otherwise derived from the date range.
    pub fn resolved_days(&self) -> i64 {
        self.days
            .or_else(|| derive_days(&self.date_range))
            .unwrap_or(0)
    }
}

/// Partial update. Only supplied fields are merged into the stored row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TripPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub saved: Option<bool>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub included_items: Option<Vec<String>>,
    /// Set by the orchestration service after merging uploads; a client
    /// body carrying `images` is rejected as an unknown field.
    #[serde(skip)]
    pub images: Option<Vec<String>>,
}

/// Client-side filter state. Transient, never persisted. Absent fields
/// impose no constraint; criteria combine with logical AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterCriteria {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub price_min: Option<f64>,
    #[serde(default)]
    pub price_max: Option<f64>,
    #[serde(default)]
    pub keyword: Option<String>,
}

impl FilterCriteria {
    /// Blank strings arrive from the filter form and mean "no constraint".
    pub fn normalized(mut self) -> Self {
        self.destination = self.destination.filter(|s| !s.trim().is_empty());
        self.keyword = self.keyword.filter(|s| !s.trim().is_empty());
        self
    }
}

/// An image file handed in by the presentation layer, not yet uploaded.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Parses `"dd/mm/yyyy - dd/mm/yyyy"` into its endpoints.
pub fn parse_date_range(range: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (from, to) = range.split_once('-')?;
    let from = NaiveDate::parse_from_str(from.trim(), DATE_FORMAT).ok()?;
    let to = NaiveDate::parse_from_str(to.trim(), DATE_FORMAT).ok()?;
    Some((from, to))
}

/// Day count of a formatted range; never negative.
pub fn derive_days(range: &str) -> Option<i64> {
    let (from, to) = parse_date_range(range)?;
    Some((to - from).num_days().max(0))
}

/// Keeps the first occurrence of each item, preserving order.
pub fn dedup_items(items: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_range() {
        let (from, to) = parse_date_range("01/01/2025 - 05/01/2025").expect("range");
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn derives_days_from_range() {
        assert_eq!(derive_days("01/01/2025 - 05/01/2025"), Some(4));
        assert_eq!(derive_days("10/03/2025 - 10/03/2025"), Some(0));
    }

    #[test]
    fn inverted_range_never_goes_negative() {
        assert_eq!(derive_days("05/01/2025 - 01/01/2025"), Some(0));
    }

    #[test]
    fn rejects_malformed_range() {
        assert_eq!(derive_days("sometime next year"), None);
    }

    #[test]
    fn input_prefers_explicit_days() {
        let input = TripInput {
            title: "Beach week".into(),
            destination: "Natal".into(),
            description: None,
            price: 1200.0,
            saved: false,
            date_range: "01/01/2025 - 05/01/2025".into(),
            days: Some(7),
            included_items: Vec::new(),
        };
        assert_eq!(input.resolved_days(), 7);
    }

    #[test]
    fn dedup_keeps_first_occurrence_and_order() {
        let items = vec![
            "breakfast".to_string(),
            "transfer".to_string(),
            "breakfast".to_string(),
            "city tour".to_string(),
        ];
        assert_eq!(
            dedup_items(items),
            vec!["breakfast", "transfer", "city tour"]
        );
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let raw = r#"{"title":"x","bogus":true}"#;
        assert!(serde_json::from_str::<TripPatch>(raw).is_err());
    }

    #[test]
    fn patch_rejects_client_supplied_images() {
        let raw = r#"{"title":"x","images":["https://cdn.example.com/a.png"]}"#;
        assert!(serde_json::from_str::<TripPatch>(raw).is_err());
    }

    #[test]
    fn blank_filter_fields_normalize_away() {
        let criteria = FilterCriteria {
            destination: Some("  ".into()),
            keyword: Some(String::new()),
            ..Default::default()
        };
        let normalized = criteria.normalized();
        assert!(normalized.destination.is_none());
        assert!(normalized.keyword.is_none());
    }
}
