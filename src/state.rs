use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    controller::TripController,
    db::DbPool,
    services::{
        notify::{ExpoDispatcher, PushDispatcher},
        object::HttpObjectStore,
        record::SqliteTripStore,
        trip::TripService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    /// The controller is a single-writer value; the async mutex serializes
    /// the HTTP handlers the way the source UI serialized its actions.
    pub controller: Arc<Mutex<TripController>>,
    pub dispatcher: Arc<dyn PushDispatcher>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let store = Arc::new(SqliteTripStore::new(db.clone()));
        let objects = Arc::new(HttpObjectStore::new(&config));
        let dispatcher: Arc<dyn PushDispatcher> = Arc::new(ExpoDispatcher::new(
            db.clone(),
            config.push_gateway_url.clone(),
        ));
        let service = TripService::new(store, objects, dispatcher.clone());
        Self {
            config,
            db,
            controller: Arc::new(Mutex::new(TripController::new(service))),
            dispatcher,
        }
    }
}
