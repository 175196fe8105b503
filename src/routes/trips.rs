use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    error::AppError,
    models::trip::{FilterCriteria, NewImage, Trip, TripInput, TripPatch},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/reload", post(reload))
        .route("/filters", put(set_filters).delete(clear_filters))
        .route("/notices", get(drain_notices))
        .route("/selection", get(selection).put(select))
        .route("/:id", get(trip_detail).patch(update_trip).delete(delete_trip))
}

#[derive(Serialize)]
struct TripListResponse {
    trips: Vec<Trip>,
    loading: bool,
    filters: FilterCriteria,
}

async fn list_trips(State(state): State<AppState>) -> Json<TripListResponse> {
    let controller = state.controller.lock().await;
    Json(TripListResponse {
        trips: controller.trips().to_vec(),
        loading: controller.loading(),
        filters: controller.filters().clone(),
    })
}

async fn reload(State(state): State<AppState>) -> StatusCode {
    state.controller.lock().await.reload().await;
    StatusCode::NO_CONTENT
}

async fn create_trip(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (input, files): (TripInput, _) = parse_trip_form(multipart).await?;
    input.validate()?;
    let trip = state.controller.lock().await.create(input, files).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Trip>, AppError> {
    let (patch, files): (TripPatch, _) = parse_trip_form(multipart).await?;
    let trip = state.controller.lock().await.update(&id, patch, files).await?;
    Ok(Json(trip))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.controller.lock().await.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn trip_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Trip>, AppError> {
    let controller = state.controller.lock().await;
    let trip = controller
        .all_trips()
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .ok_or(AppError::NotFound)?;
    Ok(Json(trip))
}

#[derive(Deserialize)]
struct SelectionRequest {
    id: Option<String>,
}

async fn select(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<StatusCode, AppError> {
    let mut controller = state.controller.lock().await;
    match request.id {
        Some(id) => {
            let trip = controller
                .all_trips()
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or(AppError::NotFound)?;
            controller.select(Some(trip));
        }
        None => controller.select(None),
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn selection(State(state): State<AppState>) -> Json<Option<Trip>> {
    Json(state.controller.lock().await.selected().cloned())
}

async fn set_filters(
    State(state): State<AppState>,
    Json(filters): Json<FilterCriteria>,
) -> Json<Vec<Trip>> {
    let mut controller = state.controller.lock().await;
    controller.set_filters(filters);
    Json(controller.trips().to_vec())
}

async fn clear_filters(State(state): State<AppState>) -> Json<Vec<Trip>> {
    let mut controller = state.controller.lock().await;
    controller.clear_filters();
    Json(controller.trips().to_vec())
}

async fn drain_notices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.lock().await.drain_notices())
}

/// Splits a multipart form into its JSON `payload` part and the attached
/// image files, keeping the files in submission order.
async fn parse_trip_form<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> Result<(T, Vec<NewImage>), AppError> {
    let mut payload: Option<T> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.to_string()))?
    {
        match field.name() {
            Some("payload") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|err| AppError::BadRequest(err.to_string()))?;
                payload = Some(
                    serde_json::from_str(&raw)
                        .map_err(|err| AppError::BadRequest(format!("invalid payload: {err}")))?,
                );
            }
            _ => {
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::BadRequest(err.to_string()))?;
                files.push(NewImage {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        }
    }

    let payload = payload.ok_or_else(|| AppError::BadRequest("missing payload part".into()))?;
    Ok((payload, files))
}
