//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable entity: {0}")]
    Unprocessable(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Respuesta de error para la API
///
/// `detail` repite el mensaje legible: los clientes existentes lo leen de ahí.
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            detail: message.clone(),
            message,
            details: None,
            code: code.to_string(),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) | AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Database(e) => {
                error!("Database error: {}", e);
                ErrorResponse::new(
                    "Database Error",
                    "Error al acceder a la base de datos".to_string(),
                    "DB_ERROR",
                )
                .with_details(json!({ "sql_error": e.to_string() }))
            }
            AppError::Validation(e) => {
                warn!("Validation error: {}", e);
                ErrorResponse::new(
                    "Validation Error",
                    "Los datos enviados no son validos".to_string(),
                    "VALIDATION_ERROR",
                )
                .with_details(json!(e))
            }
            AppError::NotFound(msg) => ErrorResponse::new("Not Found", msg, "NOT_FOUND"),
            AppError::Conflict(msg) => {
                warn!("Conflict: {}", msg);
                ErrorResponse::new("Conflict", msg, "CONFLICT")
            }
            AppError::BadRequest(msg) => ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"),
            AppError::Unprocessable(msg) => {
                ErrorResponse::new("Unprocessable Entity", msg, "UNPROCESSABLE_ENTITY")
            }
            AppError::Forbidden(msg) => {
                warn!("Forbidden access: {}", msg);
                ErrorResponse::new("Forbidden", msg, "FORBIDDEN")
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                ErrorResponse::new("Internal Server Error", msg, "INTERNAL_ERROR")
            }
            AppError::Io(e) => {
                error!("I/O error: {}", e);
                ErrorResponse::new("I/O Error", e.to_string(), "IO_ERROR")
            }
            AppError::ExternalApi(msg) => {
                error!("External API error: {}", msg);
                ErrorResponse::new("External API Error", msg, "EXTERNAL_API_ERROR")
            }
            AppError::NotImplemented(msg) => {
                ErrorResponse::new("Not Implemented", msg, "NOT_IMPLEMENTED")
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str) -> AppError {
    AppError::NotFound(format!("{} no encontrado", resource))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(message: &str) -> AppError {
    AppError::Conflict(message.to_string())
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

/// Función helper para errores de validación de negocio (422)
pub fn unprocessable_error(message: &str) -> AppError {
    AppError::Unprocessable(message.to_string())
}

/// Función helper para crear errores internos
pub fn internal_error(message: impl std::fmt::Display) -> AppError {
    AppError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(not_found_error("Vehiculo").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(conflict_error("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(bad_request_error("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            unprocessable_error("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = not_found_error("Vehiculo");
        assert_eq!(err.to_string(), "Not found: Vehiculo no encontrado");
    }
}
