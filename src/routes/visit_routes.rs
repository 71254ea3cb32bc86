use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};

use crate::dto::StatusResponse;
use crate::models::{VehicleVisit, VisitRequest};
use crate::services::{CalendarService, VisitService};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Visitas de un vehículo, montadas bajo `/vehicles`
pub fn create_vehicle_visit_router() -> Router<AppState> {
    Router::new()
        .route("/:vehicle_id/visits", get(list_visits).post(create_visit))
        .route(
            "/:vehicle_id/visits/:visit_id",
            patch(update_visit).delete(delete_visit),
        )
}

/// Rutas de visita por id, montadas bajo `/visits`
pub fn create_visit_router() -> Router<AppState> {
    Router::new().route("/:visit_id/calendar/sync", post(sync_calendar))
}

async fn list_visits(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Vec<VehicleVisit>>, AppError> {
    let service = VisitService::new(state.pool.clone());
    Ok(Json(service.list(&vehicle_id).await?))
}

async fn create_visit(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<VisitRequest>,
) -> Result<(StatusCode, Json<VehicleVisit>), AppError> {
    let service = VisitService::new(state.pool.clone());
    let visit = service.create(&vehicle_id, request).await?;
    Ok((StatusCode::CREATED, Json(visit)))
}

async fn update_visit(
    State(state): State<AppState>,
    Path((vehicle_id, visit_id)): Path<(String, i64)>,
    Json(request): Json<VisitRequest>,
) -> Result<Json<VehicleVisit>, AppError> {
    let service = VisitService::new(state.pool.clone());
    Ok(Json(service.update(&vehicle_id, visit_id, request).await?))
}

async fn delete_visit(
    State(state): State<AppState>,
    Path((vehicle_id, visit_id)): Path<(String, i64)>,
) -> Result<Json<StatusResponse>, AppError> {
    let service = VisitService::new(state.pool.clone());
    Ok(Json(service.delete(&vehicle_id, visit_id).await?))
}

/// Sincronización puntual con Google Calendar. Un fallo de Google no es un
/// error HTTP: queda guardado en la visita devuelta.
async fn sync_calendar(
    State(state): State<AppState>,
    Path(visit_id): Path<i64>,
) -> Result<Json<VehicleVisit>, AppError> {
    let service = CalendarService::new(&state);
    Ok(Json(service.sync_visit(visit_id).await?))
}
