//! Rutas HTTP
//!
//! Un router por recurso; `create_app_router` los monta todos con CORS,
//! trazas por petición y el 404 por defecto.

pub mod admin_routes;
pub mod branch_routes;
pub mod expense_routes;
pub mod file_routes;
pub mod google_routes;
pub mod link_routes;
pub mod report_routes;
pub mod system_routes;
pub mod vehicle_routes;
pub mod visit_routes;

use axum::{http::Uri, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::cors_layer;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Router completo de la API con su estado
pub fn create_app_router(state: AppState) -> Router {
    Router::new()
        .merge(system_routes::create_system_router())
        .merge(report_routes::create_dashboard_router())
        .nest("/branches", branch_routes::create_branch_router())
        .nest("/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/visits", visit_routes::create_visit_router())
        .nest("/reports", report_routes::create_report_router())
        .nest("/admin", admin_routes::create_admin_router(&state))
        .nest("/auth/google", google_routes::create_google_router(&state))
        .fallback(not_found)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Ruta no encontrada: {}", uri.path()))
}
