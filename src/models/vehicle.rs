//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle y sus variantes para CRUD operations.
//! Mapea a la tabla `vehicle` con la matrícula como primary key; el `id`
//! numérico es el rowid de SQLite y solo se usa para compatibilidad.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::domain::VehicleStatus;
use crate::utils::validation::validate_not_blank;

/// Vehicle principal - mapea exactamente a la tabla vehicle
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: i64,
    pub license_plate: String,
    pub vin: String,
    pub brand: String,
    pub model: String,
    pub version: Option<String>,
    pub year: i32,
    pub km: i64,
    pub color: Option<String>,
    pub branch_id: i64,
    pub status: VehicleStatus,
    pub status_changed_at: DateTime<Utc>,
    pub status_reason: Option<String>,
    pub reserved_until: Option<NaiveDate>,
    pub sold_at: Option<NaiveDate>,
    pub purchase_date: NaiveDate,
    pub purchase_price: Option<f64>,
    pub sale_price: Option<f64>,
    pub published_price: Option<f64>,
    pub target_margin_pct: Option<f64>,
    pub sale_notes: Option<String>,
    pub sale_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// Título legible: marca, modelo y versión
    pub fn title(&self) -> String {
        [Some(self.brand.as_str()), Some(self.model.as_str()), self.version.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Request para crear un nuevo vehículo
///
/// Acepta los nombres antiguos `location_id` y `state`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, max = 20), custom = "validate_not_blank")]
    pub license_plate: String,

    #[validate(length(min = 1, max = 64))]
    pub vin: String,

    #[validate(length(min = 1, max = 100))]
    pub brand: String,

    #[validate(length(min = 1, max = 100))]
    pub model: String,

    #[validate(length(max = 100))]
    pub version: Option<String>,

    #[validate(range(min = 1900, max = 2100))]
    pub year: i32,

    #[validate(range(min = 0))]
    pub km: i64,

    #[validate(length(max = 50))]
    pub color: Option<String>,

    #[serde(alias = "location_id")]
    pub branch_id: i64,

    #[serde(default, alias = "state")]
    pub status: Option<VehicleStatus>,

    #[validate(range(min = 0.0))]
    pub purchase_price: Option<f64>,

    pub purchase_date: NaiveDate,

    #[validate(range(min = 0.0))]
    pub sale_price: Option<f64>,

    pub sale_date: Option<NaiveDate>,

    #[validate(range(min = 0.0))]
    pub published_price: Option<f64>,

    pub target_margin_pct: Option<f64>,

    pub notes: Option<String>,
}

/// Request para actualizar un vehículo existente
///
/// La matrícula no se puede cambiar y el estado va por su propio endpoint;
/// si llegan en el body se comprueban y se ignoran.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateVehicleRequest {
    pub license_plate: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub vin: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub brand: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,

    #[validate(length(max = 100))]
    pub version: Option<String>,

    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,

    #[validate(range(min = 0))]
    pub km: Option<i64>,

    #[validate(length(max = 50))]
    pub color: Option<String>,

    #[serde(alias = "location_id")]
    pub branch_id: Option<i64>,

    #[serde(alias = "state")]
    pub status: Option<VehicleStatus>,

    #[validate(range(min = 0.0))]
    pub purchase_price: Option<f64>,

    pub purchase_date: Option<NaiveDate>,

    #[validate(range(min = 0.0))]
    pub sale_price: Option<f64>,

    pub sale_date: Option<NaiveDate>,

    #[validate(range(min = 0.0))]
    pub published_price: Option<f64>,

    pub target_margin_pct: Option<f64>,

    pub sale_notes: Option<String>,

    pub notes: Option<String>,
}

impl UpdateVehicleRequest {
    /// Nombres de los campos presentes (para el evento de timeline)
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let candidates = [
            ("vin", self.vin.is_some()),
            ("brand", self.brand.is_some()),
            ("model", self.model.is_some()),
            ("version", self.version.is_some()),
            ("year", self.year.is_some()),
            ("km", self.km.is_some()),
            ("color", self.color.is_some()),
            ("branch_id", self.branch_id.is_some()),
            ("purchase_price", self.purchase_price.is_some()),
            ("purchase_date", self.purchase_date.is_some()),
            ("sale_price", self.sale_price.is_some()),
            ("sale_date", self.sale_date.is_some()),
            ("published_price", self.published_price.is_some()),
            ("target_margin_pct", self.target_margin_pct.is_some()),
            ("sale_notes", self.sale_notes.is_some()),
            ("notes", self.notes.is_some()),
        ];
        candidates
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_legacy_names() {
        let request: CreateVehicleRequest = serde_json::from_value(serde_json::json!({
            "license_plate": "1234ABC",
            "vin": "VIN1",
            "brand": "Seat",
            "model": "Ibiza",
            "year": 2019,
            "km": 50000,
            "location_id": 2,
            "state": "published",
            "purchase_date": "2024-01-10"
        }))
        .unwrap();
        assert_eq!(request.branch_id, 2);
        assert_eq!(request.status, Some(VehicleStatus::Published));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_rejects_blank_plate() {
        let request: CreateVehicleRequest = serde_json::from_value(serde_json::json!({
            "license_plate": "   ",
            "vin": "VIN1",
            "brand": "Seat",
            "model": "Ibiza",
            "year": 2019,
            "km": 50000,
            "branch_id": 1,
            "purchase_date": "2024-01-10"
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_changed_fields() {
        let update = UpdateVehicleRequest {
            km: Some(1000),
            notes: Some("ITV pasada".to_string()),
            ..Default::default()
        };
        assert_eq!(update.changed_fields(), vec!["km", "notes"]);
    }
}
