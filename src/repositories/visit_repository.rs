use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::VehicleVisit;
use crate::utils::errors::AppError;

/// Campos de una visita ya validados
#[derive(Debug, Clone)]
pub struct VisitFields {
    pub visit_date: chrono::NaiveDate,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub scheduled_at: Option<chrono::NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub timezone: Option<String>,
}

/// Resultado de un intento de sincronización con el calendario
#[derive(Debug, Clone)]
pub struct CalendarSyncState {
    pub event_id: Option<String>,
    pub html_link: Option<String>,
    pub status: String,
    pub last_error: Option<String>,
    pub synced_at: DateTime<Utc>,
}

pub struct VisitRepository {
    pool: SqlitePool,
}

impl VisitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_vehicle(&self, plate: &str) -> Result<Vec<VehicleVisit>, AppError> {
        let visits = sqlx::query_as::<_, VehicleVisit>(
            "SELECT * FROM vehicle_visit WHERE vehicle_id = ?1 ORDER BY visit_date DESC, created_at DESC, id DESC",
        )
        .bind(plate)
        .fetch_all(&self.pool)
        .await?;
        Ok(visits)
    }

    pub async fn list_for_vehicles(&self, plates: &[String]) -> Result<Vec<VehicleVisit>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_visit WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let rows = builder.build_query_as::<VehicleVisit>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn find(&self, id: i64) -> Result<Option<VehicleVisit>, AppError> {
        let visit = sqlx::query_as::<_, VehicleVisit>("SELECT * FROM vehicle_visit WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(visit)
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        plate: &str,
        fields: &VisitFields,
        now: DateTime<Utc>,
    ) -> Result<VehicleVisit, AppError> {
        let visit = sqlx::query_as::<_, VehicleVisit>(
            r#"
            INSERT INTO vehicle_visit (
                vehicle_id, visit_date, name, phone, email, notes,
                scheduled_at, duration_minutes, timezone, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING *
            "#,
        )
        .bind(plate)
        .bind(fields.visit_date)
        .bind(&fields.name)
        .bind(&fields.phone)
        .bind(&fields.email)
        .bind(&fields.notes)
        .bind(fields.scheduled_at)
        .bind(fields.duration_minutes)
        .bind(&fields.timezone)
        .bind(now)
        .fetch_one(conn)
        .await?;
        Ok(visit)
    }

    pub async fn insert_copy(conn: &mut SqliteConnection, visit: &VehicleVisit) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO vehicle_visit (
                vehicle_id, visit_date, name, phone, email, notes, scheduled_at,
                duration_minutes, timezone, calendar_event_id, calendar_event_html_link,
                calendar_status, calendar_last_error, calendar_last_synced_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&visit.vehicle_id)
        .bind(visit.visit_date)
        .bind(&visit.name)
        .bind(&visit.phone)
        .bind(&visit.email)
        .bind(&visit.notes)
        .bind(visit.scheduled_at)
        .bind(visit.duration_minutes)
        .bind(&visit.timezone)
        .bind(&visit.calendar_event_id)
        .bind(&visit.calendar_event_html_link)
        .bind(&visit.calendar_status)
        .bind(&visit.calendar_last_error)
        .bind(visit.calendar_last_synced_at)
        .bind(visit.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn update(&self, id: i64, fields: &VisitFields) -> Result<VehicleVisit, AppError> {
        let visit = sqlx::query_as::<_, VehicleVisit>(
            r#"
            UPDATE vehicle_visit
            SET visit_date = ?2, name = ?3, phone = ?4, email = ?5, notes = ?6,
                scheduled_at = ?7, duration_minutes = ?8, timezone = ?9
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(fields.visit_date)
        .bind(&fields.name)
        .bind(&fields.phone)
        .bind(&fields.email)
        .bind(&fields.notes)
        .bind(fields.scheduled_at)
        .bind(fields.duration_minutes)
        .bind(&fields.timezone)
        .fetch_one(&self.pool)
        .await?;
        Ok(visit)
    }

    /// Guardar el resultado de la sincronización con el calendario
    pub async fn record_calendar_sync(
        &self,
        id: i64,
        state: &CalendarSyncState,
    ) -> Result<VehicleVisit, AppError> {
        let visit = sqlx::query_as::<_, VehicleVisit>(
            r#"
            UPDATE vehicle_visit
            SET calendar_event_id = COALESCE(?2, calendar_event_id),
                calendar_event_html_link = COALESCE(?3, calendar_event_html_link),
                calendar_status = ?4,
                calendar_last_error = ?5,
                calendar_last_synced_at = ?6
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&state.event_id)
        .bind(&state.html_link)
        .bind(&state.status)
        .bind(&state.last_error)
        .bind(state.synced_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(visit)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM vehicle_visit WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
