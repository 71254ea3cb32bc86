//! Conexión a SQLite
//!
//! Abre el pool, aplica las migraciones de `migrations/` y siembra las
//! sucursales por defecto cuando la tabla está vacía.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::DatabaseConfig;

#[derive(Clone)]
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Abrir el pool con la configuración dada
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Conectando a la base de datos: {}", config.url);
        let pool = config.create_pool().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }

    /// Ejecutar migraciones de la base de datos
    pub async fn run_migrations(&self) -> Result<()> {
        run_migrations(&self.pool).await?;
        Ok(())
    }

    /// Crear las sucursales por defecto si no hay ninguna
    pub async fn seed_branches(&self, names: &[String]) -> Result<u64> {
        Ok(seed_branches(&self.pool, names).await?)
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migraciones aplicadas");
    Ok(())
}

pub async fn seed_branches(pool: &SqlitePool, names: &[String]) -> Result<u64, sqlx::Error> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM branch")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(0);
    }

    let mut created = 0;
    for name in names {
        created += sqlx::query("INSERT OR IGNORE INTO branch (name) VALUES (?1)")
            .bind(name)
            .execute(pool)
            .await?
            .rows_affected();
    }
    info!("Sucursales iniciales creadas: {}", created);
    Ok(created)
}

/// Versión de esquema: última migración aplicada
pub async fn schema_version(pool: &SqlitePool) -> Result<String, sqlx::Error> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    Ok(format!("sqlx_migration:{}", version.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_and_seed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("db.sqlite").display());
        let conn = DatabaseConnection::connect(&DatabaseConfig::new(url)).await.unwrap();
        conn.run_migrations().await.unwrap();

        let names = vec!["Montgat".to_string(), "Juneda".to_string()];
        assert_eq!(conn.seed_branches(&names).await.unwrap(), 2);
        assert_eq!(conn.seed_branches(&names).await.unwrap(), 0);
        assert_eq!(schema_version(conn.pool()).await.unwrap(), "sqlx_migration:1");
    }
}
