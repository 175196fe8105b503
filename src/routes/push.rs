use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/register", post(register_token))
}

#[derive(Deserialize)]
struct RegisterRequest {
    token: String,
}

/// Fire-and-forget: registration failures are logged inside the dispatcher,
/// the client always gets a 204.
async fn register_token(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode, AppError> {
    if request.token.trim().is_empty() {
        return Err(AppError::BadRequest("token must not be empty".into()));
    }
    state.dispatcher.register_token(&request.token).await;
    Ok(StatusCode::NO_CONTENT)
}
