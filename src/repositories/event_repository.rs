//! Historial de un vehículo
//!
//! Las inserciones reciben la conexión de la transacción que hace el
//! cambio, así el evento se guarda o se descarta junto con él.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::domain::VehicleStatus;
use crate::models::{NewVehicleEvent, VehicleEvent, VehicleEventType, VehicleStatusEvent};
use crate::utils::errors::AppError;

pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Eventos del timeline, más recientes primero
    pub async fn list_events(
        &self,
        plate: &str,
        types: &[VehicleEventType],
        limit: i64,
    ) -> Result<Vec<VehicleEvent>, AppError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_event WHERE vehicle_id = ");
        builder.push_bind(plate.to_string());
        if !types.is_empty() {
            builder.push(" AND type IN (");
            let mut separated = builder.separated(", ");
            for event_type in types {
                separated.push_bind(*event_type);
            }
            separated.push_unseparated(")");
        }
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(limit);

        let events = builder
            .build_query_as::<VehicleEvent>()
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    pub async fn list_status_events(&self, plate: &str, limit: i64) -> Result<Vec<VehicleStatusEvent>, AppError> {
        let events = sqlx::query_as::<_, VehicleStatusEvent>(
            "SELECT * FROM vehicle_status_event WHERE vehicle_id = ?1 ORDER BY changed_at DESC, id DESC LIMIT ?2",
        )
        .bind(plate)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn list_events_for_vehicles(&self, plates: &[String]) -> Result<Vec<VehicleEvent>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_event WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let events = builder
            .build_query_as::<VehicleEvent>()
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    pub async fn list_status_events_for_vehicles(
        &self,
        plates: &[String],
    ) -> Result<Vec<VehicleStatusEvent>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_status_event WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let events = builder
            .build_query_as::<VehicleStatusEvent>()
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    pub async fn insert_event(
        conn: &mut SqliteConnection,
        plate: &str,
        event: &NewVehicleEvent,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO vehicle_event (vehicle_id, type, payload, actor, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(plate)
        .bind(event.event_type)
        .bind(Json(&event.payload))
        .bind(&event.actor)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_status_event(
        conn: &mut SqliteConnection,
        plate: &str,
        from: VehicleStatus,
        to: VehicleStatus,
        note: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO vehicle_status_event (vehicle_id, from_status, to_status, changed_at, note, actor)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(plate)
        .bind(from)
        .bind(to)
        .bind(now)
        .bind(note)
        .bind(actor)
        .execute(conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Copias fieles (importación de paquetes)
    pub async fn insert_event_copy(conn: &mut SqliteConnection, event: &VehicleEvent) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO vehicle_event (vehicle_id, type, payload, actor, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&event.vehicle_id)
        .bind(event.event_type)
        .bind(&event.payload)
        .bind(&event.actor)
        .bind(event.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn insert_status_event_copy(
        conn: &mut SqliteConnection,
        event: &VehicleStatusEvent,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO vehicle_status_event (vehicle_id, from_status, to_status, changed_at, note, actor)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&event.vehicle_id)
        .bind(event.from_status)
        .bind(event.to_status)
        .bind(event.changed_at)
        .bind(&event.note)
        .bind(&event.actor)
        .execute(conn)
        .await?;
        Ok(())
    }
}
