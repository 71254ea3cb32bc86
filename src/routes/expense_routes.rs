use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};

use crate::dto::StatusResponse;
use crate::models::{CreateExpenseRequest, UpdateExpenseRequest, VehicleExpense};
use crate::services::ExpenseService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Gastos de un vehículo, montados bajo `/vehicles`
pub fn create_expense_router() -> Router<AppState> {
    Router::new()
        .route("/:vehicle_id/expenses", get(list_expenses).post(create_expense))
        .route(
            "/:vehicle_id/expenses/:expense_id",
            patch(update_expense).delete(delete_expense),
        )
}

async fn list_expenses(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Vec<VehicleExpense>>, AppError> {
    let service = ExpenseService::new(state.pool.clone());
    Ok(Json(service.list(&vehicle_id).await?))
}

async fn create_expense(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<VehicleExpense>), AppError> {
    let service = ExpenseService::new(state.pool.clone());
    let expense = service.create(&vehicle_id, request).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

async fn update_expense(
    State(state): State<AppState>,
    Path((vehicle_id, expense_id)): Path<(String, i64)>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<VehicleExpense>, AppError> {
    let service = ExpenseService::new(state.pool.clone());
    Ok(Json(service.update(&vehicle_id, expense_id, request).await?))
}

async fn delete_expense(
    State(state): State<AppState>,
    Path((vehicle_id, expense_id)): Path<(String, i64)>,
) -> Result<Json<StatusResponse>, AppError> {
    let service = ExpenseService::new(state.pool.clone());
    Ok(Json(service.delete(&vehicle_id, expense_id).await?))
}
