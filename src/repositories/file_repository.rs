use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::{FileCategory, NewVehicleFile, VehicleFile};
use crate::utils::errors::AppError;

pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_vehicle(
        &self,
        plate: &str,
        category: Option<FileCategory>,
    ) -> Result<Vec<VehicleFile>, AppError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_file WHERE vehicle_id = ");
        builder.push_bind(plate.to_string());
        if let Some(category) = category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let files = builder
            .build_query_as::<VehicleFile>()
            .fetch_all(&self.pool)
            .await?;
        Ok(files)
    }

    pub async fn list_for_vehicles(&self, plates: &[String]) -> Result<Vec<VehicleFile>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_file WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let files = builder
            .build_query_as::<VehicleFile>()
            .fetch_all(&self.pool)
            .await?;
        Ok(files)
    }

    pub async fn find(&self, id: i64) -> Result<Option<VehicleFile>, AppError> {
        let file = sqlx::query_as::<_, VehicleFile>("SELECT * FROM vehicle_file WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    /// Fichero del vehículo dado (para enlazar gastos)
    pub async fn find_for_vehicle(&self, plate: &str, id: i64) -> Result<Option<VehicleFile>, AppError> {
        let file = sqlx::query_as::<_, VehicleFile>(
            "SELECT * FROM vehicle_file WHERE id = ?1 AND vehicle_id = ?2",
        )
        .bind(id)
        .bind(plate)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    pub async fn count_by_category(&self, plate: &str, category: FileCategory) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM vehicle_file WHERE vehicle_id = ?1 AND category = ?2",
        )
        .bind(plate)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        plate: &str,
        file: &NewVehicleFile,
        now: DateTime<Utc>,
    ) -> Result<VehicleFile, AppError> {
        let created = sqlx::query_as::<_, VehicleFile>(
            r#"
            INSERT INTO vehicle_file (
                vehicle_id, category, original_name, stored_name, mime_type,
                size_bytes, notes, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING *
            "#,
        )
        .bind(plate)
        .bind(file.category)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.mime_type)
        .bind(file.size_bytes)
        .bind(&file.notes)
        .bind(now)
        .fetch_one(conn)
        .await?;
        Ok(created)
    }

    /// Nombres en disco de los ficheros de un vehículo
    pub async fn stored_names(conn: &mut SqliteConnection, plate: &str) -> Result<Vec<String>, AppError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT stored_name FROM vehicle_file WHERE vehicle_id = ?1 ORDER BY id",
        )
        .bind(plate)
        .fetch_all(conn)
        .await?;
        Ok(names)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM vehicle_file WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
