//! Rutas de administración: backups, restauración, vaciado y paquetes de
//! vehículos. Todas pasan por el filtro de acceso local.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::dto::{
    BackupCreateRequest, BackupCreated, BackupListItem, BackupRestoreRequest, ImportResult,
    RestoreResult, VehicleExportRequest, WipeRequest, WipeResult,
};
use crate::middleware::require_local;
use crate::routes::file_routes::{attachment_header, multipart_error};
use crate::services::{BackupService, TransferService};
use crate::state::AppState;
use crate::utils::errors::{unprocessable_error, AppError};

/// Tamaño máximo de un paquete de importación
const MAX_PACKAGE_BYTES: usize = 512 * 1024 * 1024;
const DEFAULT_IMPORT_MODE: &str = "skip";

pub fn create_admin_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/backups", post(create_backup).get(list_backups))
        .route("/backups/:backup_id/restore", post(restore_backup))
        .route("/wipe", post(wipe))
        .route("/vehicles/export", post(export_vehicles))
        .route(
            "/vehicles/import",
            post(import_vehicles).layer(DefaultBodyLimit::max(MAX_PACKAGE_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_local))
}

fn backup_service(state: &AppState) -> BackupService {
    BackupService::new(state.pool.clone(), &state.config, state.restore_lock.clone())
}

/// Sin cuerpo se incluyen los ficheros
async fn create_backup(
    State(state): State<AppState>,
    request: Option<Json<BackupCreateRequest>>,
) -> Result<Json<BackupCreated>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(backup_service(&state).create(request).await?))
}

async fn list_backups(State(state): State<AppState>) -> Result<Json<Vec<BackupListItem>>, AppError> {
    Ok(Json(backup_service(&state).list().await?))
}

/// Sin cuerpo es un dry-run
async fn restore_backup(
    State(state): State<AppState>,
    Path(backup_id): Path<String>,
    request: Option<Json<BackupRestoreRequest>>,
) -> Result<Json<RestoreResult>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(backup_service(&state).restore(&backup_id, request).await?))
}

async fn wipe(
    State(state): State<AppState>,
    request: Option<Json<WipeRequest>>,
) -> Result<Json<WipeResult>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(backup_service(&state).wipe(request).await?))
}

async fn export_vehicles(
    State(state): State<AppState>,
    Json(request): Json<VehicleExportRequest>,
) -> Result<impl IntoResponse, AppError> {
    let service = TransferService::new(state.pool.clone(), &state.config);
    let package = service.export(request).await?;
    info!(
        "Paquete {} generado: {} vehiculos, {} ficheros",
        package.manifest.package_id, package.manifest.vehicles_count, package.manifest.files_count
    );
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (header::CONTENT_DISPOSITION, attachment_header(&package.file_name)),
    ];
    Ok((headers, package.bytes))
}

/// Campos: `file` (zip) y `mode` (`skip`, `overwrite` o `new_copy`)
async fn import_vehicles(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResult>, AppError> {
    let mut upload = None;
    let mut mode = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => upload = Some(field.bytes().await.map_err(multipart_error)?),
            Some("mode") => mode = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| unprocessable_error("Falta el campo file"))?;
    let mode = mode.unwrap_or_else(|| DEFAULT_IMPORT_MODE.to_string());

    let service = TransferService::new(state.pool.clone(), &state.config);
    Ok(Json(service.import(upload.to_vec(), &mode).await?))
}
