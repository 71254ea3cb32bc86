use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::GoogleToken;
use crate::utils::errors::AppError;

/// Datos devueltos por Google al conceder o refrescar un token
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub scopes: Option<String>,
}

pub struct GoogleTokenRepository {
    pool: SqlitePool,
}

impl GoogleTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn latest(&self) -> Result<Option<GoogleToken>, AppError> {
        let token = sqlx::query_as::<_, GoogleToken>("SELECT * FROM google_token ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    /// Guardar la concesión. Si Google no reenvía el refresh token se
    /// conserva el anterior.
    pub async fn upsert(&self, grant: &TokenGrant, now: DateTime<Utc>) -> Result<GoogleToken, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, GoogleToken>("SELECT * FROM google_token ORDER BY id DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;

        let token = match existing {
            Some(existing) => {
                sqlx::query_as::<_, GoogleToken>(
                    r#"
                    UPDATE google_token
                    SET access_token = ?2,
                        refresh_token = COALESCE(?3, refresh_token),
                        expiry = ?4,
                        scopes = COALESCE(?5, scopes),
                        updated_at = ?6
                    WHERE id = ?1
                    RETURNING *
                    "#,
                )
                .bind(existing.id)
                .bind(&grant.access_token)
                .bind(&grant.refresh_token)
                .bind(grant.expiry)
                .bind(&grant.scopes)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, GoogleToken>(
                    r#"
                    INSERT INTO google_token (access_token, refresh_token, expiry, scopes, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                    RETURNING *
                    "#,
                )
                .bind(&grant.access_token)
                .bind(&grant.refresh_token)
                .bind(grant.expiry)
                .bind(&grant.scopes)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(token)
    }
}
