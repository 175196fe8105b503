pub mod push;
pub mod trips;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/trips", trips::router())
        .nest("/push", push::router())
        .with_state(state)
}
