use sqlx::SqlitePool;

use crate::models::Branch;
use crate::utils::errors::AppError;

pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Branch>, AppError> {
        let branches = sqlx::query_as::<_, Branch>("SELECT id, name FROM branch ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(branches)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Branch>, AppError> {
        let branch = sqlx::query_as::<_, Branch>("SELECT id, name FROM branch WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(branch)
    }

    pub async fn name_exists(&self, name: &str, exclude_id: Option<i64>) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM branch WHERE LOWER(name) = LOWER(?1) AND id != ?2)",
        )
        .bind(name)
        .bind(exclude_id.unwrap_or(-1))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, name: &str) -> Result<Branch, AppError> {
        let branch = sqlx::query_as::<_, Branch>("INSERT INTO branch (name) VALUES (?1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(branch)
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<Option<Branch>, AppError> {
        let branch = sqlx::query_as::<_, Branch>(
            "UPDATE branch SET name = ?2 WHERE id = ?1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(branch)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM branch WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
