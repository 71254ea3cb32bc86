use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::dto::StatusResponse;
use crate::models::{CreateLinkRequest, VehicleLink};
use crate::services::LinkService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Enlaces de anuncios de un vehículo, montados bajo `/vehicles`
pub fn create_link_router() -> Router<AppState> {
    Router::new()
        .route("/:vehicle_id/links", get(list_links).post(create_link))
        .route("/:vehicle_id/links/:link_id", delete(delete_link))
}

async fn list_links(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Vec<VehicleLink>>, AppError> {
    let service = LinkService::new(state.pool.clone());
    Ok(Json(service.list(&vehicle_id).await?))
}

async fn create_link(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<VehicleLink>), AppError> {
    let service = LinkService::new(state.pool.clone());
    let link = service.create(&vehicle_id, request).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

async fn delete_link(
    State(state): State<AppState>,
    Path((vehicle_id, link_id)): Path<(String, i64)>,
) -> Result<Json<StatusResponse>, AppError> {
    let service = LinkService::new(state.pool.clone());
    Ok(Json(service.delete(&vehicle_id, link_id).await?))
}
