//! Visitas de clientes
//!
//! Una visita necesita fecha, nombre y al menos un dato de contacto.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::dto::StatusResponse;
use crate::models::{NewVehicleEvent, VehicleEventType, VehicleVisit, VisitRequest};
use crate::repositories::{EventRepository, VisitFields, VisitRepository};
use crate::services::vehicle_service::VehicleService;
use crate::utils::errors::{unprocessable_error, AppError, AppResult};
use crate::utils::validation::non_empty;

pub struct VisitService {
    pool: SqlitePool,
    vehicles: VehicleService,
    visits: VisitRepository,
}

impl VisitService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleService::new(pool.clone()),
            visits: VisitRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn list(&self, identifier: &str) -> AppResult<Vec<VehicleVisit>> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        self.visits.list_for_vehicle(&vehicle.license_plate).await
    }

    pub async fn create(&self, identifier: &str, request: VisitRequest) -> AppResult<VehicleVisit> {
        request.validate()?;
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;
        let fields = visit_fields(request)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let visit = VisitRepository::insert(&mut tx, &plate, &fields, now).await?;
        let event = NewVehicleEvent::new(VehicleEventType::VisitCreated, visit.event_payload());
        EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
        tx.commit().await?;

        info!("Visita {} registrada para {}", visit.id, plate);
        Ok(visit)
    }

    /// Los campos ausentes conservan su valor actual
    pub async fn update(&self, identifier: &str, visit_id: i64, request: VisitRequest) -> AppResult<VehicleVisit> {
        request.validate()?;
        let vehicle = self.vehicles.resolve(identifier).await?;
        let current = self.find(&vehicle.license_plate, visit_id).await?;

        let merged = VisitRequest {
            visit_date: request.visit_date.or(Some(current.visit_date)),
            name: request.name.or(Some(current.name)),
            phone: if request.phone.is_some() { request.phone } else { current.phone },
            email: if request.email.is_some() { request.email } else { current.email },
            notes: if request.notes.is_some() { request.notes } else { current.notes },
            scheduled_at: request.scheduled_at.or(current.scheduled_at),
            duration_minutes: request.duration_minutes.or(current.duration_minutes),
            timezone: request.timezone.or(current.timezone),
        };
        let fields = visit_fields(merged)?;
        let visit = self.visits.update(visit_id, &fields).await?;

        info!("Visita {} actualizada", visit.id);
        Ok(visit)
    }

    pub async fn delete(&self, identifier: &str, visit_id: i64) -> AppResult<StatusResponse> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;
        let visit = self.find(&plate, visit_id).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        VisitRepository::delete(&mut tx, visit.id).await?;
        let event = NewVehicleEvent::new(VehicleEventType::VisitDeleted, visit.event_payload());
        EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
        tx.commit().await?;

        info!("Visita {} eliminada ({})", visit.id, plate);
        Ok(StatusResponse::ok())
    }

    /// Visita por id, sin comprobar el vehículo (sincronización de calendario)
    pub async fn get(&self, visit_id: i64) -> AppResult<VehicleVisit> {
        self.visits
            .find(visit_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Visita no encontrada".to_string()))
    }

    async fn find(&self, plate: &str, visit_id: i64) -> AppResult<VehicleVisit> {
        match self.visits.find(visit_id).await? {
            Some(visit) if visit.vehicle_id == plate => Ok(visit),
            _ => Err(AppError::NotFound("Visita no encontrada".to_string())),
        }
    }
}

/// Campos obligatorios en este orden: fecha, nombre, teléfono o email
fn visit_fields(request: VisitRequest) -> AppResult<VisitFields> {
    let visit_date = request
        .visit_date
        .ok_or_else(|| unprocessable_error("La fecha de visita es requerida"))?;
    let name = non_empty(request.name).ok_or_else(|| unprocessable_error("El nombre es requerido"))?;
    let phone = non_empty(request.phone);
    let email = non_empty(request.email);
    if phone.is_none() && email.is_none() {
        return Err(unprocessable_error("Telefono o email es requerido"));
    }
    if email.as_deref().is_some_and(|email| !validator::validate_email(email)) {
        return Err(unprocessable_error("Email invalido"));
    }

    Ok(VisitFields {
        visit_date,
        name,
        phone,
        email,
        notes: non_empty(request.notes),
        scheduled_at: request.scheduled_at,
        duration_minutes: request.duration_minutes,
        timezone: non_empty(request.timezone),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request() -> VisitRequest {
        VisitRequest {
            visit_date: NaiveDate::from_ymd_opt(2024, 3, 2),
            name: Some("Marta".to_string()),
            phone: Some("600123123".to_string()),
            ..Default::default()
        }
    }

    fn message(err: AppError) -> String {
        match err {
            AppError::Unprocessable(msg) => msg,
            other => panic!("error inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_required_fields_in_order() {
        assert_eq!(
            message(visit_fields(VisitRequest::default()).unwrap_err()),
            "La fecha de visita es requerida"
        );

        let no_name = VisitRequest {
            name: Some("  ".to_string()),
            ..request()
        };
        assert_eq!(message(visit_fields(no_name).unwrap_err()), "El nombre es requerido");

        let no_contact = VisitRequest {
            phone: None,
            email: Some(" ".to_string()),
            ..request()
        };
        assert_eq!(
            message(visit_fields(no_contact).unwrap_err()),
            "Telefono o email es requerido"
        );
    }

    #[test]
    fn test_valid_visit_fields() {
        let fields = visit_fields(VisitRequest {
            email: Some("marta@example.com".to_string()),
            notes: Some("".to_string()),
            ..request()
        })
        .unwrap();
        assert_eq!(fields.name, "Marta");
        assert_eq!(fields.notes, None);
        assert_eq!(fields.email.as_deref(), Some("marta@example.com"));
    }

    #[test]
    fn test_invalid_email() {
        let err = visit_fields(VisitRequest {
            phone: None,
            email: Some("no-es-email".to_string()),
            ..request()
        })
        .unwrap_err();
        assert_eq!(message(err), "Email invalido");

        for email in ["test@", "@example.com", "ana @example.com"] {
            let err = visit_fields(VisitRequest {
                email: Some(email.to_string()),
                ..request()
            })
            .unwrap_err();
            assert_eq!(message(err), "Email invalido", "{}", email);
        }

        let fields = visit_fields(VisitRequest {
            email: Some(" ana@example.com ".to_string()),
            ..request()
        })
        .unwrap();
        assert_eq!(fields.email.as_deref(), Some("ana@example.com"));
    }
}
