//! Estado del sistema: comprobaciones de salud y versión

use std::path::Path;

use sqlx::SqlitePool;
use tracing::warn;

use crate::config::EnvironmentConfig;
use crate::database::schema_version;
use crate::dto::{HealthChecks, HealthResponse, VersionResponse};

const PROBE_FILE: &str = ".healthcheck";

pub struct SystemService {
    pool: SqlitePool,
}

impl SystemService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn health(&self, config: &EnvironmentConfig) -> HealthResponse {
        let checks = HealthChecks {
            db_readwrite: self.check_db().await,
            storage_readwrite: check_dir(&config.storage_root).await,
            backups_readwrite: check_dir(&config.backup_dir).await,
            migrations: self.check_migrations().await,
        };
        let ok = checks.db_readwrite && checks.storage_readwrite && checks.backups_readwrite && checks.migrations;
        HealthResponse {
            ok,
            checks,
            data_dir: config.data_dir.display().to_string(),
        }
    }

    pub async fn version(&self, config: &EnvironmentConfig) -> VersionResponse {
        let schema_version = match schema_version(&self.pool).await {
            Ok(version) => version,
            Err(e) => {
                warn!("No se pudo leer la version de esquema: {}", e);
                "unknown".to_string()
            }
        };
        VersionResponse {
            app_version: config.app_version.clone(),
            branch: config.app_branch.clone(),
            commit: config.app_commit.clone(),
            env: config.environment.clone(),
            schema_version,
        }
    }

    /// Escritura y lectura en una tabla temporal, sin dejar rastro
    async fn check_db(&self) -> bool {
        let result: Result<bool, sqlx::Error> = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("CREATE TEMP TABLE IF NOT EXISTS health_probe (value INTEGER)")
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO health_probe (value) VALUES (1)")
                .execute(&mut *tx)
                .await?;
            let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM health_probe")
                .fetch_one(&mut *tx)
                .await?;
            tx.rollback().await?;
            Ok(count > 0)
        }
        .await;
        result.unwrap_or_else(|e| {
            warn!("Health check de base de datos fallido: {}", e);
            false
        })
    }

    async fn check_migrations(&self) -> bool {
        let result: Result<(i64, i64), sqlx::Error> = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN success THEN 0 ELSE 1 END), 0) FROM _sqlx_migrations",
        )
        .fetch_one(&self.pool)
        .await;
        match result {
            Ok((applied, failed)) => applied > 0 && failed == 0,
            Err(e) => {
                warn!("Health check de migraciones fallido: {}", e);
                false
            }
        }
    }
}

async fn check_dir(dir: &Path) -> bool {
    let probe = dir.join(PROBE_FILE);
    let result: std::io::Result<bool> = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&probe, b"ok").await?;
        let content = tokio::fs::read(&probe).await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(content == b"ok")
    }
    .await;
    result.unwrap_or_else(|e| {
        warn!("Health check de {} fallido: {}", dir.display(), e);
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_dir(&dir.path().join("storage")).await);
        assert!(!dir.path().join("storage").join(PROBE_FILE).exists());
    }
}
