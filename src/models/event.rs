//! Eventos de vehículo
//!
//! Dos historiales de solo inserción: los cambios de estado
//! (`vehicle_status_event`) y el timeline general (`vehicle_event`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::domain::VehicleStatus;

/// Actor por defecto cuando la petición no identifica a nadie
pub const DEFAULT_ACTOR: &str = "local_user";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleStatusEvent {
    pub id: i64,
    pub vehicle_id: String,
    pub from_status: VehicleStatus,
    pub to_status: VehicleStatus,
    pub changed_at: DateTime<Utc>,
    pub note: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleEventType {
    StatusChange,
    ExpenseCreated,
    ExpenseUpdated,
    ExpenseDeleted,
    VisitCreated,
    VisitDeleted,
    FileUploaded,
    FileDeleted,
    VehicleUpdated,
    BranchMoved,
    SaleClosed,
}

impl VehicleEventType {
    pub const ALL: [VehicleEventType; 11] = [
        VehicleEventType::StatusChange,
        VehicleEventType::ExpenseCreated,
        VehicleEventType::ExpenseUpdated,
        VehicleEventType::ExpenseDeleted,
        VehicleEventType::VisitCreated,
        VehicleEventType::VisitDeleted,
        VehicleEventType::FileUploaded,
        VehicleEventType::FileDeleted,
        VehicleEventType::VehicleUpdated,
        VehicleEventType::BranchMoved,
        VehicleEventType::SaleClosed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleEventType::StatusChange => "STATUS_CHANGE",
            VehicleEventType::ExpenseCreated => "EXPENSE_CREATED",
            VehicleEventType::ExpenseUpdated => "EXPENSE_UPDATED",
            VehicleEventType::ExpenseDeleted => "EXPENSE_DELETED",
            VehicleEventType::VisitCreated => "VISIT_CREATED",
            VehicleEventType::VisitDeleted => "VISIT_DELETED",
            VehicleEventType::FileUploaded => "FILE_UPLOADED",
            VehicleEventType::FileDeleted => "FILE_DELETED",
            VehicleEventType::VehicleUpdated => "VEHICLE_UPDATED",
            VehicleEventType::BranchMoved => "BRANCH_MOVED",
            VehicleEventType::SaleClosed => "SALE_CLOSED",
        }
    }
}

impl fmt::Display for VehicleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        VehicleEventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("Tipo de evento invalido: {}", s))
    }
}

/// Evento del timeline - mapea exactamente a la tabla vehicle_event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleEvent {
    pub id: i64,
    pub vehicle_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub event_type: VehicleEventType,
    pub payload: Json<serde_json::Value>,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Evento pendiente de insertar
#[derive(Debug, Clone)]
pub struct NewVehicleEvent {
    pub event_type: VehicleEventType,
    pub payload: serde_json::Value,
    pub actor: Option<String>,
}

impl NewVehicleEvent {
    pub fn new(event_type: VehicleEventType, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            payload,
            actor: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        assert_eq!(
            serde_json::to_value(VehicleEventType::BranchMoved).unwrap(),
            serde_json::json!("BRANCH_MOVED")
        );
        assert_eq!("sale_closed".parse::<VehicleEventType>(), Ok(VehicleEventType::SaleClosed));
        assert!("UNKNOWN".parse::<VehicleEventType>().is_err());
    }
}
