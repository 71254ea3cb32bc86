//! Timeline de vehículo con un resumen legible por evento

use serde_json::Value;
use sqlx::SqlitePool;

use crate::dto::TimelineEntry;
use crate::models::{VehicleEvent, VehicleEventType};
use crate::repositories::EventRepository;
use crate::services::vehicle_service::VehicleService;
use crate::utils::errors::{bad_request_error, AppResult};

pub const DEFAULT_TIMELINE_LIMIT: i64 = 50;
pub const MAX_TIMELINE_LIMIT: i64 = 500;

pub struct TimelineService {
    vehicles: VehicleService,
    events: EventRepository,
}

impl TimelineService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleService::new(pool.clone()),
            events: EventRepository::new(pool),
        }
    }

    pub async fn list(
        &self,
        identifier: &str,
        types: &[VehicleEventType],
        limit: i64,
    ) -> AppResult<Vec<TimelineEntry>> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        let events = self
            .events
            .list_events(&vehicle.license_plate, types, limit)
            .await?;
        Ok(events
            .into_iter()
            .map(|event| {
                let text = summary(&event);
                TimelineEntry::new(event, text)
            })
            .collect())
    }
}

/// Tipos del parámetro `type`, repetido o separado por comas
pub fn parse_types<'a>(values: impl IntoIterator<Item = &'a str>) -> AppResult<Vec<VehicleEventType>> {
    let mut types = Vec::new();
    for raw in values.into_iter().flat_map(|v| v.split(',')) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let event_type = raw
            .parse::<VehicleEventType>()
            .map_err(|_| bad_request_error("Tipo de evento invalido"))?;
        if !types.contains(&event_type) {
            types.push(event_type);
        }
    }
    Ok(types)
}

pub fn summary(event: &VehicleEvent) -> String {
    let payload = &event.payload.0;
    match event.event_type {
        VehicleEventType::StatusChange => format!(
            "Estado cambiado de {} a {}",
            text(payload, "from"),
            text(payload, "to")
        ),
        VehicleEventType::ExpenseCreated => format!(
            "Gasto creado: {} {}",
            text(payload, "amount"),
            text(payload, "currency")
        )
        .trim()
        .to_string(),
        VehicleEventType::ExpenseUpdated => "Gasto actualizado".to_string(),
        VehicleEventType::ExpenseDeleted => "Gasto eliminado".to_string(),
        VehicleEventType::VisitCreated => format!("Visita creada: {}", or_dash(text(payload, "name"))),
        VehicleEventType::VisitDeleted => "Visita eliminada".to_string(),
        VehicleEventType::FileUploaded => format!("Archivo subido: {}", text(payload, "name")),
        VehicleEventType::FileDeleted => format!("Archivo eliminado: {}", text(payload, "name")),
        VehicleEventType::VehicleUpdated => "Vehiculo actualizado".to_string(),
        VehicleEventType::BranchMoved => {
            let from = first_present(payload, &["from_branch_name", "from_branch_id"]);
            let to = first_present(payload, &["to_branch_name", "to_branch_id"]);
            format!("Sucursal cambiada de {} a {}", from, to)
        }
        VehicleEventType::SaleClosed => format!("Venta cerrada: {}", or_dash(text(payload, "sale_price"))),
    }
}

fn text(payload: &Value, key: &str) -> String {
    match payload.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn or_dash(value: String) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value
    }
}

fn first_present(payload: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| text(payload, key))
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use sqlx::types::Json;

    fn event(event_type: VehicleEventType, payload: Value) -> VehicleEvent {
        VehicleEvent {
            id: 1,
            vehicle_id: "1234ABC".to_string(),
            event_type,
            payload: Json(payload),
            actor: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summaries() {
        assert_eq!(
            summary(&event(VehicleEventType::StatusChange, json!({"from": "ready", "to": "published"}))),
            "Estado cambiado de ready a published"
        );
        assert_eq!(
            summary(&event(VehicleEventType::ExpenseCreated, json!({"amount": 120.5, "currency": "EUR"}))),
            "Gasto creado: 120.5 EUR"
        );
        assert_eq!(
            summary(&event(VehicleEventType::VisitCreated, json!({}))),
            "Visita creada: -"
        );
        assert_eq!(
            summary(&event(
                VehicleEventType::BranchMoved,
                json!({"from_branch_id": 1, "to_branch_id": 2, "to_branch_name": "Juneda"})
            )),
            "Sucursal cambiada de 1 a Juneda"
        );
    }

    #[test]
    fn test_parse_types() {
        let types = parse_types(["STATUS_CHANGE,expense_created", "STATUS_CHANGE", ""]).unwrap();
        assert_eq!(
            types,
            vec![VehicleEventType::StatusChange, VehicleEventType::ExpenseCreated]
        );
        assert!(parse_types(["NOPE"]).is_err());
    }
}
