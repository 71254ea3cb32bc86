//! Rutas de sistema: salud y versión

use axum::{extract::State, routing::get, Json, Router};

use crate::dto::{HealthResponse, VersionResponse};
use crate::services::SystemService;
use crate::state::AppState;

pub fn create_system_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// `ok` es falso si alguna comprobación falla, pero la respuesta es siempre 200
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let service = SystemService::new(state.pool.clone());
    Json(service.health(&state.config).await)
}

async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    let service = SystemService::new(state.pool.clone());
    Json(service.version(&state.config).await)
}
