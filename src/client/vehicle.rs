//! Vehículo tal como lo ve la pasarela
//!
//! Según la versión del backend el vehículo llega con `branch_id` o
//! `location_id` y con `status` o `state`. Aquí se leen ambos y se exponen
//! los dos rellenos; sin estado se asume `intake`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::VehicleStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawVehicle")]
pub struct ApiVehicle {
    pub license_plate: String,
    pub vin: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub year: Option<i32>,
    pub km: Option<i64>,
    pub color: Option<String>,
    pub branch_id: Option<i64>,
    pub location_id: Option<i64>,
    pub status: VehicleStatus,
    pub state: VehicleStatus,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub status_reason: Option<String>,
    pub reserved_until: Option<NaiveDate>,
    pub sold_at: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
    pub sale_price: Option<f64>,
    pub sale_date: Option<NaiveDate>,
    pub sale_notes: Option<String>,
    pub published_price: Option<f64>,
    pub target_margin_pct: Option<f64>,
    pub notes: Option<String>,
    pub total_expenses: Option<f64>,
    pub profit: Option<f64>,
    pub margin_pct: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Forma tolerante de lectura: todo opcional, con los dos nombres
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawVehicle {
    license_plate: String,
    vin: Option<String>,
    brand: Option<String>,
    model: Option<String>,
    version: Option<String>,
    year: Option<i32>,
    km: Option<i64>,
    color: Option<String>,
    branch_id: Option<i64>,
    location_id: Option<i64>,
    status: Option<VehicleStatus>,
    state: Option<VehicleStatus>,
    status_changed_at: Option<DateTime<Utc>>,
    status_reason: Option<String>,
    reserved_until: Option<NaiveDate>,
    sold_at: Option<NaiveDate>,
    purchase_price: Option<f64>,
    purchase_date: Option<NaiveDate>,
    sale_price: Option<f64>,
    sale_date: Option<NaiveDate>,
    sale_notes: Option<String>,
    published_price: Option<f64>,
    target_margin_pct: Option<f64>,
    notes: Option<String>,
    total_expenses: Option<f64>,
    profit: Option<f64>,
    margin_pct: Option<f64>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<RawVehicle> for ApiVehicle {
    fn from(raw: RawVehicle) -> Self {
        let branch = raw.branch_id.or(raw.location_id);
        let status = raw.status.or(raw.state).unwrap_or_default();
        Self {
            license_plate: raw.license_plate,
            vin: raw.vin,
            brand: raw.brand,
            model: raw.model,
            version: raw.version,
            year: raw.year,
            km: raw.km,
            color: raw.color,
            branch_id: branch,
            location_id: branch,
            status,
            state: status,
            status_changed_at: raw.status_changed_at,
            status_reason: raw.status_reason,
            reserved_until: raw.reserved_until,
            sold_at: raw.sold_at,
            purchase_price: raw.purchase_price,
            purchase_date: raw.purchase_date,
            sale_price: raw.sale_price,
            sale_date: raw.sale_date,
            sale_notes: raw.sale_notes,
            published_price: raw.published_price,
            target_margin_pct: raw.target_margin_pct,
            notes: raw.notes,
            total_expenses: raw.total_expenses,
            profit: raw.profit,
            margin_pct: raw.margin_pct,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_names_are_normalized() {
        let vehicle: ApiVehicle = serde_json::from_value(json!({
            "license_plate": "1234ABC",
            "location_id": 2,
            "state": "published",
        }))
        .unwrap();
        assert_eq!(vehicle.branch_id, Some(2));
        assert_eq!(vehicle.location_id, Some(2));
        assert_eq!(vehicle.status, VehicleStatus::Published);
        assert_eq!(vehicle.state, VehicleStatus::Published);
    }

    #[test]
    fn test_current_names_win_and_status_defaults_to_intake() {
        let vehicle: ApiVehicle = serde_json::from_value(json!({
            "license_plate": "1234ABC",
            "branch_id": 1,
            "location_id": 9,
        }))
        .unwrap();
        assert_eq!(vehicle.branch_id, Some(1));
        assert_eq!(vehicle.location_id, Some(1));
        assert_eq!(vehicle.status, VehicleStatus::Intake);
        assert_eq!(vehicle.state, VehicleStatus::Intake);
    }
}
