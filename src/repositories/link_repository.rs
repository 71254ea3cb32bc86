use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::VehicleLink;
use crate::utils::errors::AppError;

pub struct LinkRepository {
    pool: SqlitePool,
}

impl LinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_vehicle(&self, plate: &str) -> Result<Vec<VehicleLink>, AppError> {
        let links = sqlx::query_as::<_, VehicleLink>(
            "SELECT * FROM vehicle_link WHERE vehicle_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(plate)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    pub async fn list_for_vehicles(&self, plates: &[String]) -> Result<Vec<VehicleLink>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_link WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let rows = builder.build_query_as::<VehicleLink>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn find(&self, id: i64) -> Result<Option<VehicleLink>, AppError> {
        let link = sqlx::query_as::<_, VehicleLink>("SELECT * FROM vehicle_link WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(link)
    }

    pub async fn create(
        &self,
        plate: &str,
        title: Option<&str>,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<VehicleLink, AppError> {
        let link = sqlx::query_as::<_, VehicleLink>(
            "INSERT INTO vehicle_link (vehicle_id, title, url, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING *",
        )
        .bind(plate)
        .bind(title)
        .bind(url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(link)
    }

    pub async fn insert_copy(conn: &mut SqliteConnection, link: &VehicleLink) -> Result<(), AppError> {
        sqlx::query("INSERT INTO vehicle_link (vehicle_id, title, url, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&link.vehicle_id)
            .bind(&link.title)
            .bind(&link.url)
            .bind(link.created_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vehicle_link WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
