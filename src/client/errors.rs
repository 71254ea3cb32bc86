//! Errores de la pasarela HTTP

use thiserror::Error;

/// Fallos de una llamada a la API. Ninguno se reintenta: se devuelven tal
/// cual a quien llamó.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Error de red: {0}")]
    Network(#[from] reqwest::Error),

    /// Respuesta no 2xx; `body` es el cuerpo tal cual llegó
    #[error("{}", status_message(.status, .body))]
    Status { status: u16, body: String },

    #[error("Respuesta JSON invalida: {0}")]
    Decode(#[from] serde_json::Error),

    /// Petición rechazada antes de salir a la red
    #[error("{0}")]
    Rejected(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// El cuerpo es el mensaje; si viene vacío, solo el código
fn status_message(status: &u16, body: &str) -> String {
    if body.trim().is_empty() {
        format!("Error {}", status)
    } else {
        body.to_string()
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = ClientError::Status {
            status: 409,
            body: r#"{"detail":"Matricula duplicada"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"{"detail":"Matricula duplicada"}"#);
        assert_eq!(err.status(), Some(409));

        let empty = ClientError::Status {
            status: 502,
            body: String::new(),
        };
        assert_eq!(empty.to_string(), "Error 502");
        assert!(!empty.is_not_found());
    }

    #[test]
    fn test_rejected_message() {
        let err = ClientError::Rejected("sold_at es requerido para marcar como vendido".to_string());
        assert_eq!(err.to_string(), "sold_at es requerido para marcar como vendido");
        assert_eq!(err.status(), None);
    }
}
