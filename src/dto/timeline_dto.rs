//! DTOs del timeline de vehículo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{VehicleEvent, VehicleEventType};

/// Evento con su resumen legible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: i64,
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub event_type: VehicleEventType,
    pub payload: serde_json::Value,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
    pub summary: String,
}

impl TimelineEntry {
    pub fn new(event: VehicleEvent, summary: String) -> Self {
        Self {
            id: event.id,
            vehicle_id: event.vehicle_id,
            event_type: event.event_type,
            payload: event.payload.0,
            actor: event.actor,
            created_at: event.created_at,
            summary,
        }
    }
}
