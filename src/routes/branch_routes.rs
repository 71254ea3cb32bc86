use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};

use crate::dto::StatusResponse;
use crate::models::{Branch, BranchRequest};
use crate::services::BranchService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_branch_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_branches).post(create_branch))
        .route("/:branch_id", patch(update_branch).delete(delete_branch))
}

async fn list_branches(State(state): State<AppState>) -> Result<Json<Vec<Branch>>, AppError> {
    let service = BranchService::new(state.pool.clone());
    Ok(Json(service.list().await?))
}

async fn create_branch(
    State(state): State<AppState>,
    Json(request): Json<BranchRequest>,
) -> Result<(StatusCode, Json<Branch>), AppError> {
    let service = BranchService::new(state.pool.clone());
    let branch = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

async fn update_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
    Json(request): Json<BranchRequest>,
) -> Result<Json<Branch>, AppError> {
    let service = BranchService::new(state.pool.clone());
    Ok(Json(service.update(branch_id, request).await?))
}

/// 409 mientras algún vehículo apunte a la sucursal
async fn delete_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
) -> Result<Json<StatusResponse>, AppError> {
    let service = BranchService::new(state.pool.clone());
    Ok(Json(service.delete(branch_id).await?))
}
