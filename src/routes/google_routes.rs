//! Conexión OAuth con Google Calendar, solo desde la máquina local

use axum::{
    extract::{Query, State},
    middleware,
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::dto::GoogleStatusResponse;
use crate::middleware::require_local;
use crate::services::calendar_service::AFTER_CONNECT_REDIRECT;
use crate::services::CalendarService;
use crate::state::AppState;
use crate::utils::errors::AppError;

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
}

pub fn create_google_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/start", get(start))
        .route("/callback", get(callback))
        .route("/status", get(status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_local))
}

async fn start(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let url = CalendarService::new(&state).auth_url().await?;
    Ok(Redirect::to(&url))
}

async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    CalendarService::new(&state)
        .handle_callback(query.code.as_deref(), query.state.as_deref())
        .await?;
    Ok(Redirect::to(AFTER_CONNECT_REDIRECT))
}

async fn status(State(state): State<AppState>) -> Result<Json<GoogleStatusResponse>, AppError> {
    Ok(Json(CalendarService::new(&state).status().await?))
}
