//! Modelo de VehicleLink
//!
//! Enlaces externos de un vehículo (anuncios publicados, fichas...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::utils::validation::validate_http_url;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleLink {
    pub id: i64,
    pub vehicle_id: String,
    pub title: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLinkRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 2000), custom = "validate_http_url")]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_url_must_be_http() {
        let ok = CreateLinkRequest {
            title: Some("Anuncio".to_string()),
            url: "https://www.coches.net/123".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateLinkRequest {
            title: None,
            url: "file:///etc/passwd".to_string(),
        };
        assert!(bad.validate().is_err());
    }
}
