use std::collections::VecDeque;

use serde::Serialize;
use tracing::error;

use crate::{
    error::AppError,
    models::trip::{FilterCriteria, NewImage, Trip, TripInput, TripPatch},
    services::trip::TripService,
};

/// User-visible outcome of an action. Only generic text reaches the user;
/// the underlying error detail goes to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Holds the authoritative in-memory trip collection plus the derived
/// filtered view, and funnels every user action through the service.
///
/// Single-writer by design: correctness after a mutation comes from a full
/// reload, never from incremental cache surgery.
pub struct TripController {
    service: TripService,
    trips: Vec<Trip>,
    filtered: Vec<Trip>,
    selected: Option<Trip>,
    filters: FilterCriteria,
    loading: bool,
    notices: VecDeque<Notice>,
}

impl TripController {
    pub fn new(service: TripService) -> Self {
        Self {
            service,
            trips: Vec::new(),
            filtered: Vec::new(),
            selected: None,
            filters: FilterCriteria::default(),
            loading: false,
            notices: VecDeque::new(),
        }
    }

    /// Replaces the cache from the backend. On failure the previous cache
    /// stays intact and the user gets one generic notice.
    pub async fn reload(&mut self) {
        self.loading = true;
        match self.service.list().await {
            Ok(trips) => {
                self.trips = trips;
                self.apply_filters();
            }
            Err(err) => {
                error!("could not load trips: {err}");
                self.notices.push_back(Notice::error("Could not load trips"));
            }
        }
        self.loading = false;
    }

    pub async fn create(&mut self, input: TripInput, files: Vec<NewImage>) -> Result<Trip, AppError> {
        match self.service.create(input, files).await {
            Ok(trip) => {
                self.notices
                    .push_back(Notice::success("Trip created successfully"));
                self.reload().await;
                Ok(trip)
            }
            Err(err) => {
                error!("could not create trip: {err}");
                self.notices
                    .push_back(Notice::error("Could not create the trip"));
                Err(err)
            }
        }
    }

    pub async fn update(
        &mut self,
        id: &str,
        patch: TripPatch,
        files: Vec<NewImage>,
    ) -> Result<Trip, AppError> {
        match self.service.update(id, patch, files).await {
            Ok(trip) => {
                self.notices
                    .push_back(Notice::success("Trip updated successfully"));
                self.reload().await;
                Ok(trip)
            }
            Err(err) => {
                error!("could not update trip {id}: {err}");
                self.notices
                    .push_back(Notice::error("Could not update the trip"));
                Err(err)
            }
        }
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
        match self.service.delete(id).await {
            Ok(()) => {
                self.notices
                    .push_back(Notice::success("Trip deleted successfully"));
                self.reload().await;
                Ok(())
            }
            Err(err) => {
                error!("could not delete trip {id}: {err}");
                self.notices
                    .push_back(Notice::error("Could not delete the trip"));
                Err(err)
            }
        }
    }

    /// Sets the detail selection; the cache is untouched.
    pub fn select(&mut self, trip: Option<Trip>) {
        self.selected = trip;
    }

    pub fn set_filters(&mut self, filters: FilterCriteria) {
        self.filters = filters.normalized();
        self.apply_filters();
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterCriteria::default();
        self.apply_filters();
    }

    fn apply_filters(&mut self) {
        self.filtered = TripService::filter(&self.trips, &self.filters);
    }

    /// The filtered view the presentation layer renders.
    pub fn trips(&self) -> &[Trip] {
        &self.filtered
    }

    pub fn all_trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn selected(&self) -> Option<&Trip> {
        self.selected.as_ref()
    }

    pub fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::services::{
        notify::{PushDispatcher, PushOutcome},
        object::ObjectStore,
        record::TripStore,
    };

    struct StubStore {
        trips: Mutex<Vec<Trip>>,
        fail_list: bool,
    }

    #[async_trait]
    impl TripStore for StubStore {
        async fn list(&self) -> Result<Vec<Trip>, AppError> {
            if self.fail_list {
                return Err(AppError::Store(sqlx::Error::PoolClosed));
            }
            Ok(self.trips.lock().unwrap().clone())
        }

        async fn get(&self, id: &str) -> Result<Option<Trip>, AppError> {
            Ok(self
                .trips
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == id)
                .cloned())
        }

        async fn insert(&self, input: TripInput) -> Result<Trip, AppError> {
            let trip = Trip {
                id: "new-trip".into(),
                title: input.title,
                destination: input.destination,
                description: input.description,
                price: input.price,
                saved: input.saved,
                date_range: input.date_range,
                days: input.days.unwrap_or(0),
                included_items: input.included_items,
                images: Vec::new(),
                created_at: Utc::now(),
            };
            self.trips.lock().unwrap().push(trip.clone());
            Ok(trip)
        }

        async fn update(&self, id: &str, patch: TripPatch) -> Result<Trip, AppError> {
            let mut trips = self.trips.lock().unwrap();
            let trip = trips
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(sqlx::Error::RowNotFound)?;
            if let Some(images) = patch.images {
                trip.images = images;
            }
            Ok(trip.clone())
        }

        async fn delete(&self, id: &str) -> Result<(), AppError> {
            self.trips.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    struct NoopBucket;

    #[async_trait]
    impl ObjectStore for NoopBucket {
        async fn upload(&self, files: &[NewImage], owner_id: &str) -> Result<Vec<String>, AppError> {
            Ok(files
                .iter()
                .map(|f| format!("https://cdn.test/b/{owner_id}/{}", f.file_name))
                .collect())
        }

        async fn remove(&self, _urls: &[String]) -> Result<(), AppError> {
            Ok(())
        }
    }

    struct SilentDispatcher;

    #[async_trait]
    impl PushDispatcher for SilentDispatcher {
        async fn notify_new_trip(&self, _title: &str, _destination: &str) -> PushOutcome {
            PushOutcome::NoRecipients
        }

        async fn register_token(&self, _token: &str) {}
    }

    fn trip(id: &str, title: &str, destination: &str, price: f64) -> Trip {
        Trip {
            id: id.into(),
            title: title.into(),
            destination: destination.into(),
            description: None,
            price,
            saved: false,
            date_range: "01/01/2025 - 05/01/2025".into(),
            days: 4,
            included_items: Vec::new(),
            images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn controller(trips: Vec<Trip>, fail_list: bool) -> TripController {
        let service = TripService::new(
            Arc::new(StubStore {
                trips: Mutex::new(trips),
                fail_list,
            }),
            Arc::new(NoopBucket),
            Arc::new(SilentDispatcher),
        );
        TripController::new(service)
    }

    #[tokio::test]
    async fn reload_replaces_cache_and_recomputes_view() {
        let mut ctl = controller(vec![trip("1", "Beach week", "Natal", 100.0)], false);
        ctl.reload().await;
        assert_eq!(ctl.all_trips().len(), 1);
        assert_eq!(ctl.trips().len(), 1);
        assert!(!ctl.loading());
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_cache_and_notices() {
        let mut ctl = controller(vec![trip("1", "Beach week", "Natal", 100.0)], false);
        ctl.reload().await;

        // Swap in a failing backend behind the same cached state.
        let failing = controller(Vec::new(), true);
        ctl.service = failing.service;
        ctl.reload().await;

        assert_eq!(ctl.all_trips().len(), 1, "cache must stay intact");
        let notices = ctl.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn filters_recompute_synchronously() {
        let mut ctl = controller(
            vec![
                trip("1", "Beach week", "Natal", 100.0),
                trip("2", "City break", "Recife", 300.0),
            ],
            false,
        );
        ctl.reload().await;

        ctl.set_filters(FilterCriteria {
            destination: Some("natal".into()),
            ..Default::default()
        });
        assert_eq!(ctl.trips().len(), 1);
        assert_eq!(ctl.all_trips().len(), 2);

        ctl.clear_filters();
        assert_eq!(ctl.trips().len(), 2);
    }

    #[tokio::test]
    async fn create_notices_success_and_reloads() {
        let mut ctl = controller(Vec::new(), false);
        ctl.reload().await;

        let input = TripInput {
            title: "Beach week".into(),
            destination: "Natal".into(),
            description: None,
            price: 100.0,
            saved: false,
            date_range: "01/01/2025 - 05/01/2025".into(),
            days: Some(4),
            included_items: Vec::new(),
        };
        ctl.create(input, Vec::new()).await.expect("create");

        assert_eq!(ctl.all_trips().len(), 1);
        let notices = ctl.drain_notices();
        assert_eq!(notices[0].kind, NoticeKind::Success);
    }

    #[tokio::test]
    async fn select_leaves_cache_alone() {
        let mut ctl = controller(vec![trip("1", "Beach week", "Natal", 100.0)], false);
        ctl.reload().await;

        let chosen = ctl.all_trips()[0].clone();
        ctl.select(Some(chosen.clone()));
        assert_eq!(ctl.selected().map(|t| t.id.as_str()), Some("1"));
        assert_eq!(ctl.all_trips().len(), 1);

        ctl.select(None);
        assert!(ctl.selected().is_none());
    }
}
