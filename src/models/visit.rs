//! Modelo de VehicleVisit
//!
//! Visitas de clientes interesados en un vehículo. Los campos `calendar_*`
//! reflejan el último intento de sincronización con Google Calendar.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

pub const DEFAULT_VISIT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_VISIT_TIMEZONE: &str = "Europe/Madrid";

/// VehicleVisit principal - mapea exactamente a la tabla vehicle_visit
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleVisit {
    pub id: i64,
    pub vehicle_id: String,
    pub visit_date: NaiveDate,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub timezone: Option<String>,
    pub calendar_event_id: Option<String>,
    pub calendar_event_html_link: Option<String>,
    pub calendar_status: Option<String>,
    pub calendar_last_error: Option<String>,
    pub calendar_last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VehicleVisit {
    pub fn event_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "phone": self.phone,
            "email": self.email,
        })
    }
}

/// Request para crear o actualizar una visita
///
/// Los campos obligatorios se comprueban en el servicio para devolver el
/// mensaje concreto de cada caso.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct VisitRequest {
    pub visit_date: Option<NaiveDate>,

    #[validate(length(max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 50))]
    pub phone: Option<String>,

    #[validate(length(max = 200))]
    pub email: Option<String>,

    pub notes: Option<String>,

    /// Hora local en la zona de la visita
    pub scheduled_at: Option<NaiveDateTime>,

    #[validate(range(min = 5, max = 480))]
    pub duration_minutes: Option<i64>,

    #[validate(length(max = 64))]
    pub timezone: Option<String>,
}
