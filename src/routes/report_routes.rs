//! Rutas de informes, dashboard y exportación CSV

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::dto::{BranchReportRow, DashboardQuery, DashboardSummary, KpiReport, ReportQuery, VehicleReportRow};
use crate::services::{ExportService, ReportService};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Informes agregados, montados bajo `/reports`
pub fn create_report_router() -> Router<AppState> {
    Router::new()
        .route("/kpis", get(report_kpis))
        .route("/vehicles", get(report_vehicles))
        .route("/by-branch", get(report_by_branch))
}

/// `/dashboard` y `/export/:resource`
pub fn create_dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/export/:resource", get(export_csv))
}

async fn report_kpis(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<KpiReport>, AppError> {
    let service = ReportService::new(state.pool.clone());
    Ok(Json(service.kpis(query.into_filters()?).await?))
}

async fn report_vehicles(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<VehicleReportRow>>, AppError> {
    let service = ReportService::new(state.pool.clone());
    Ok(Json(service.vehicles(query.into_filters()?).await?))
}

async fn report_by_branch(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<BranchReportRow>>, AppError> {
    let service = ReportService::new(state.pool.clone());
    Ok(Json(service.by_branch(query.into_filters()?).await?))
}

async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let service = ReportService::new(state.pool.clone());
    Ok(Json(service.dashboard(query).await?))
}

async fn export_csv(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = ExportService::new(state.pool.clone());
    let (resource, csv) = service.export(&resource).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", resource.file_name()),
        ),
    ];
    Ok((headers, csv))
}
