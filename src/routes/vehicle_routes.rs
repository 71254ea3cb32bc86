//! Rutas de vehículos
//!
//! `:vehicle_id` es la matrícula (normalizada en el servicio) o el id
//! numérico antiguo. Los recursos colgantes (gastos, visitas, enlaces,
//! ficheros) se montan aquí mismo para compartir el prefijo.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::domain::VehicleKpis;
use crate::dto::{
    LimitQuery, SaleRequest, SaleSummary, StatusChangeRequest, StatusResponse, TimelineEntry,
    VehicleListQuery, VehicleResponse,
};
use crate::models::{CreateVehicleRequest, MoveBranchRequest, UpdateVehicleRequest, VehicleStatusEvent};
use crate::routes::{expense_routes, file_routes, link_routes, visit_routes};
use crate::services::timeline_service::{parse_types, DEFAULT_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT};
use crate::services::{TimelineService, VehicleService};
use crate::state::AppState;
use crate::utils::errors::AppError;

const STATUS_EVENTS_DEFAULT_LIMIT: i64 = 50;
const STATUS_EVENTS_MAX_LIMIT: i64 = 500;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_vehicle).get(list_vehicles))
        .route(
            "/:vehicle_id",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
        .route("/:vehicle_id/status", post(change_status))
        .route("/:vehicle_id/status/events", get(list_status_events))
        .route("/:vehicle_id/move-branch", post(move_branch))
        .route("/:vehicle_id/sale", post(close_sale).get(get_sale))
        .route("/:vehicle_id/kpis", get(vehicle_kpis))
        .route("/:vehicle_id/timeline", get(vehicle_timeline))
        .merge(expense_routes::create_expense_router())
        .merge(visit_routes::create_vehicle_visit_router())
        .merge(link_routes::create_link_router())
        .merge(file_routes::create_file_router())
}

async fn create_vehicle(
    State(state): State<AppState>,
    Json(request): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<VehicleResponse>), AppError> {
    let service = VehicleService::new(state.pool.clone());
    let vehicle = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn list_vehicles(
    State(state): State<AppState>,
    Query(query): Query<VehicleListQuery>,
) -> Result<Json<Vec<VehicleResponse>>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.list(&query).await?))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<VehicleResponse>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.get(&vehicle_id).await?))
}

async fn update_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<UpdateVehicleRequest>,
) -> Result<Json<VehicleResponse>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.update(&vehicle_id, request).await?))
}

/// Borra también la carpeta de ficheros del vehículo
async fn delete_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.delete(&vehicle_id, &state.config.storage_root).await?))
}

async fn change_status(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<VehicleResponse>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.change_status(&vehicle_id, request).await?))
}

async fn list_status_events(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<VehicleStatusEvent>>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    let limit = query.resolve(STATUS_EVENTS_DEFAULT_LIMIT, STATUS_EVENTS_MAX_LIMIT);
    Ok(Json(service.status_events(&vehicle_id, limit).await?))
}

async fn move_branch(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<MoveBranchRequest>,
) -> Result<Json<VehicleResponse>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.move_branch(&vehicle_id, request).await?))
}

async fn close_sale(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<SaleRequest>,
) -> Result<Json<VehicleResponse>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.close_sale(&vehicle_id, request).await?))
}

async fn get_sale(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<SaleSummary>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.get_sale(&vehicle_id).await?))
}

async fn vehicle_kpis(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<VehicleKpis>, AppError> {
    let service = VehicleService::new(state.pool.clone());
    Ok(Json(service.kpis(&vehicle_id).await?))
}

/// `?limit=N&type=A&type=B` (o `type=A,B`); los pares se leen a mano
/// porque `type` puede repetirse
async fn vehicle_timeline(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TimelineEntry>>, AppError> {
    let limit = params
        .iter()
        .find(|(key, _)| key == "limit")
        .and_then(|(_, value)| value.trim().parse::<i64>().ok());
    let limit = LimitQuery { limit }.resolve(DEFAULT_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT);
    let types = parse_types(
        params
            .iter()
            .filter(|(key, _)| key == "type")
            .map(|(_, value)| value.as_str()),
    )?;

    let service = TimelineService::new(state.pool.clone());
    Ok(Json(service.list(&vehicle_id, &types, limit).await?))
}
