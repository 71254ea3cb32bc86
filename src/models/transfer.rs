//! Modelo de BranchTransfer
//!
//! Historial de traslados de un vehículo entre sucursales.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct BranchTransfer {
    pub id: i64,
    pub vehicle_id: String,
    pub from_branch_id: Option<i64>,
    pub to_branch_id: i64,
    pub transfer_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request para mover un vehículo de sucursal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveBranchRequest {
    #[serde(alias = "to_location_id")]
    pub to_branch_id: i64,

    pub transfer_date: Option<NaiveDate>,

    #[serde(alias = "notes")]
    #[validate(length(max = 500))]
    pub note: Option<String>,
}
