//! DTOs de vehículos
//!
//! Respuestas de lectura (con los campos financieros derivados) y
//! parámetros de consulta de los endpoints de vehículos.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{VehicleFinancials, VehicleStatus};
use crate::models::{Vehicle, VehicleExpense};

/// Vehículo con sus campos financieros recalculados
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleResponse {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    #[serde(flatten)]
    pub financials: VehicleFinancials,
}

impl VehicleResponse {
    pub fn new(vehicle: Vehicle, expenses: &[VehicleExpense]) -> Self {
        let amounts: Vec<_> = expenses.iter().map(VehicleExpense::as_amount).collect();
        let financials = VehicleFinancials::compute(&amounts, vehicle.sale_price);
        Self { vehicle, financials }
    }
}

/// Filtros de `GET /vehicles`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleListQuery {
    #[serde(alias = "state")]
    pub status: Option<VehicleStatus>,
    #[serde(alias = "location_id")]
    pub branch_id: Option<i64>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    /// Límite acotado a `1..=max`, `default` si no viene
    pub fn resolve(&self, default: i64, max: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// Request de cierre de venta
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaleRequest {
    #[validate(range(min = 0.0))]
    pub sale_price: f64,
    pub sold_at: Option<NaiveDate>,
    pub sale_notes: Option<String>,
}

/// Resumen de la venta de un vehículo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleSummary {
    pub vehicle_id: String,
    pub sale_price: f64,
    pub sold_at: Option<NaiveDate>,
    pub sale_date: Option<NaiveDate>,
    pub sale_notes: Option<String>,
    pub total_expenses: f64,
    pub profit: Option<f64>,
    pub margin_pct: Option<f64>,
}

impl SaleSummary {
    /// `None` si el vehículo aún no tiene precio de venta
    pub fn from_vehicle(response: &VehicleResponse) -> Option<Self> {
        let vehicle = &response.vehicle;
        let sale_price = vehicle.sale_price?;
        Some(Self {
            vehicle_id: vehicle.license_plate.clone(),
            sale_price,
            sold_at: vehicle.sold_at,
            sale_date: vehicle.sale_date,
            sale_notes: vehicle.sale_notes.clone(),
            total_expenses: response.financials.total_expenses,
            profit: response.financials.profit,
            margin_pct: response.financials.margin_pct,
        })
    }
}

/// Request de cambio de estado con actor opcional
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    #[serde(flatten)]
    pub change: crate::domain::StatusChange,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Respuesta genérica de borrado
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

