use std::sync::Arc;

use tracing::warn;

use crate::{
    error::AppError,
    models::trip::{FilterCriteria, NewImage, Trip, TripInput, TripPatch},
    services::{
        notify::{PushDispatcher, PushOutcome},
        object::ObjectStore,
        record::TripStore,
    },
};

/// Sequences the multi-step trip workflows across the record store, the
/// object store and the push dispatcher. Collaborators are injected, so
/// tests can substitute any of them.
///
/// The multi-call workflows are not atomic: a failure after the initial
/// insert leaves the record behind with partial or no image linkage.
#[derive(Clone)]
pub struct TripService {
    store: Arc<dyn TripStore>,
    objects: Arc<dyn ObjectStore>,
    dispatcher: Arc<dyn PushDispatcher>,
}

impl TripService {
    pub fn new(
        store: Arc<dyn TripStore>,
        objects: Arc<dyn ObjectStore>,
        dispatcher: Arc<dyn PushDispatcher>,
    ) -> Self {
        Self {
            store,
            objects,
            dispatcher,
        }
    }

    pub async fn list(&self) -> Result<Vec<Trip>, AppError> {
        self.store.list().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Trip>, AppError> {
        self.store.get(id).await
    }

    /// Two-phase creation: the insert assigns the id the image paths are
    /// namespaced under, so it has to happen before any upload. The follow-up
    /// update links the uploaded URLs to the record. The notification runs
    /// last and its outcome never affects the returned value.
    pub async fn create(&self, input: TripInput, files: Vec<NewImage>) -> Result<Trip, AppError> {
        let created = self.store.insert(input).await?;

        let images = if files.is_empty() {
            Vec::new()
        } else {
            self.objects.upload(&files, &created.id).await?
        };

        let trip = self
            .store
            .update(
                &created.id,
                TripPatch {
                    images: Some(images),
                    ..TripPatch::default()
                },
            )
            .await?;

        let outcome = self
            .dispatcher
            .notify_new_trip(&trip.title, &trip.destination)
            .await;
        if let PushOutcome::Failed(reason) = &outcome {
            warn!(trip = %trip.id, "new-trip notification not delivered: {reason}");
        }

        Ok(trip)
    }

    /// Newly uploaded images are appended after the existing ones; existing
    /// entries are never dropped, reordered or deduplicated. A vanished
    /// target at the initial fetch only means "no existing images"; the
    /// update call itself still fails on a missing row.
    pub async fn update(
        &self,
        id: &str,
        patch: TripPatch,
        new_files: Vec<NewImage>,
    ) -> Result<Trip, AppError> {
        let mut images = self
            .store
            .get(id)
            .await?
            .map(|trip| trip.images)
            .unwrap_or_default();

        if !new_files.is_empty() {
            images.extend(self.objects.upload(&new_files, id).await?);
        }

        self.store
            .update(
                id,
                TripPatch {
                    images: Some(images),
                    ..patch
                },
            )
            .await
    }

    /// Attachments go first, then the record. A trip without images never
    /// touches the object store, and an already-absent trip skips straight
    /// to the (tolerant) record delete.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if let Some(trip) = self.store.get(id).await? {
            if !trip.images.is_empty() {
                self.objects.remove(&trip.images).await?;
            }
        }
        self.store.delete(id).await
    }

    /// Pure, synchronous, order-preserving. Criteria AND together; absent
    /// fields impose no constraint; substring matches ignore case.
    pub fn filter(trips: &[Trip], criteria: &FilterCriteria) -> Vec<Trip> {
        trips
            .iter()
            .filter(|trip| {
                if let Some(destination) = &criteria.destination {
                    if !trip
                        .destination
                        .to_lowercase()
                        .contains(&destination.to_lowercase())
                    {
                        return false;
                    }
                }
                if let Some(min) = criteria.price_min {
                    if trip.price < min {
                        return false;
                    }
                }
                if let Some(max) = criteria.price_max {
                    if trip.price > max {
                        return false;
                    }
                }
                if let Some(keyword) = &criteria.keyword {
                    if !trip.title.to_lowercase().contains(&keyword.to_lowercase()) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect()
    }
}
