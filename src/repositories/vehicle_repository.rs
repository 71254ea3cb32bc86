//! Repositorio de vehículos
//!
//! El `id` numérico expuesto es el rowid de SQLite; la clave real es la
//! matrícula.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::dto::VehicleListQuery;
use crate::models::Vehicle;
use crate::utils::errors::AppError;

const VEHICLE_SELECT: &str = "SELECT rowid AS id, * FROM vehicle";

pub struct VehicleRepository {
    pool: SqlitePool,
}

impl VehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_plate(&self, plate: &str) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("{} WHERE license_plate = ?1", VEHICLE_SELECT))
            .bind(plate)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    pub async fn find_by_legacy_id(&self, id: i64) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("{} WHERE rowid = ?1", VEHICLE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle)
    }

    pub async fn plate_exists(&self, plate: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vehicle WHERE license_plate = ?1)")
                .bind(plate)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn find_by_vin(&self, vin: &str) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "{} WHERE UPPER(vin) = UPPER(?1) ORDER BY created_at LIMIT 1",
            VEHICLE_SELECT
        ))
        .bind(vin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vehicle)
    }

    pub async fn list(&self, query: &VehicleListQuery) -> Result<Vec<Vehicle>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(VEHICLE_SELECT);
        builder.push(" WHERE 1 = 1");
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(branch_id) = query.branch_id {
            builder.push(" AND branch_id = ").push_bind(branch_id);
        }
        if let Some(from) = query.from_date {
            builder.push(" AND purchase_date >= ").push_bind(from);
        }
        if let Some(to) = query.to_date {
            builder.push(" AND purchase_date <= ").push_bind(to);
        }
        builder.push(" ORDER BY created_at DESC");

        let vehicles = builder.build_query_as::<Vehicle>().fetch_all(&self.pool).await?;
        Ok(vehicles)
    }

    pub async fn list_all(&self) -> Result<Vec<Vehicle>, AppError> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!("{} ORDER BY license_plate", VEHICLE_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    pub async fn list_by_plates(&self, plates: &[String]) -> Result<Vec<Vehicle>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(VEHICLE_SELECT);
        builder.push(" WHERE license_plate IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY license_plate");

        let vehicles = builder.build_query_as::<Vehicle>().fetch_all(&self.pool).await?;
        Ok(vehicles)
    }

    pub async fn count_by_branch(&self, branch_id: i64) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vehicle WHERE branch_id = ?1")
            .bind(branch_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Leer un vehículo dentro de una transacción
    pub async fn fetch(conn: &mut SqliteConnection, plate: &str) -> Result<Option<Vehicle>, AppError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!("{} WHERE license_plate = ?1", VEHICLE_SELECT))
            .bind(plate)
            .fetch_optional(conn)
            .await?;
        Ok(vehicle)
    }

    /// Insertar un vehículo completo (el `id` se ignora)
    pub async fn insert(conn: &mut SqliteConnection, vehicle: &Vehicle) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO vehicle (
                license_plate, vin, brand, model, version, year, km, color, branch_id,
                status, status_changed_at, status_reason, reserved_until, sold_at,
                purchase_date, purchase_price, sale_price, published_price, target_margin_pct,
                sale_notes, sale_date, notes, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)
            "#,
        )
        .bind(&vehicle.license_plate)
        .bind(&vehicle.vin)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(&vehicle.version)
        .bind(vehicle.year)
        .bind(vehicle.km)
        .bind(&vehicle.color)
        .bind(vehicle.branch_id)
        .bind(vehicle.status)
        .bind(vehicle.status_changed_at)
        .bind(&vehicle.status_reason)
        .bind(vehicle.reserved_until)
        .bind(vehicle.sold_at)
        .bind(vehicle.purchase_date)
        .bind(vehicle.purchase_price)
        .bind(vehicle.sale_price)
        .bind(vehicle.published_price)
        .bind(vehicle.target_margin_pct)
        .bind(&vehicle.sale_notes)
        .bind(vehicle.sale_date)
        .bind(&vehicle.notes)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Guardar todos los campos mutables de un vehículo existente
    pub async fn save(conn: &mut SqliteConnection, vehicle: &Vehicle) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE vehicle
            SET vin = ?2, brand = ?3, model = ?4, version = ?5, year = ?6, km = ?7, color = ?8,
                branch_id = ?9, status = ?10, status_changed_at = ?11, status_reason = ?12,
                reserved_until = ?13, sold_at = ?14, purchase_date = ?15, purchase_price = ?16,
                sale_price = ?17, published_price = ?18, target_margin_pct = ?19,
                sale_notes = ?20, sale_date = ?21, notes = ?22, updated_at = ?23
            WHERE license_plate = ?1
            "#,
        )
        .bind(&vehicle.license_plate)
        .bind(&vehicle.vin)
        .bind(&vehicle.brand)
        .bind(&vehicle.model)
        .bind(&vehicle.version)
        .bind(vehicle.year)
        .bind(vehicle.km)
        .bind(&vehicle.color)
        .bind(vehicle.branch_id)
        .bind(vehicle.status)
        .bind(vehicle.status_changed_at)
        .bind(&vehicle.status_reason)
        .bind(vehicle.reserved_until)
        .bind(vehicle.sold_at)
        .bind(vehicle.purchase_date)
        .bind(vehicle.purchase_price)
        .bind(vehicle.sale_price)
        .bind(vehicle.published_price)
        .bind(vehicle.target_margin_pct)
        .bind(&vehicle.sale_notes)
        .bind(vehicle.sale_date)
        .bind(&vehicle.notes)
        .bind(vehicle.updated_at)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Vehiculo no encontrado".to_string()));
        }
        Ok(())
    }

    /// Borrar el vehículo; las tablas hijas caen por ON DELETE CASCADE
    pub async fn delete(conn: &mut SqliteConnection, plate: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vehicle WHERE license_plate = ?1")
            .bind(plate)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Borrar todo lo relacionado con un vehículo, dejando la fila principal
    pub async fn delete_related(conn: &mut SqliteConnection, plate: &str) -> Result<(), AppError> {
        for table in [
            "vehicle_expense",
            "vehicle_visit",
            "vehicle_link",
            "vehicle_event",
            "vehicle_status_event",
            "branch_transfer",
            "vehicle_file",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE vehicle_id = ?1", table))
                .bind(plate)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn plate_taken(conn: &mut SqliteConnection, plate: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM vehicle WHERE license_plate = ?1)")
                .bind(plate)
                .fetch_one(conn)
                .await?;
        Ok(exists)
    }
}
