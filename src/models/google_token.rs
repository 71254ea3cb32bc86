//! Tokens OAuth de Google Calendar
//!
//! Solo se guarda una fila: la última autorización concedida.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct GoogleToken {
    pub id: i64,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub scopes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GoogleToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|expiry| expiry <= now).unwrap_or(false)
    }

    /// Caduca dentro del margen dado (se refresca antes de usarlo)
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expiry.map(|expiry| expiry <= now + margin).unwrap_or(false)
    }

    pub fn scope_list(&self) -> Vec<String> {
        self.scopes
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expiry: Option<DateTime<Utc>>) -> GoogleToken {
        let now = Utc::now();
        GoogleToken {
            id: 1,
            access_token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expiry,
            scopes: Some("https://www.googleapis.com/auth/calendar.events openid".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_expiry_checks() {
        let now = Utc::now();
        let t = token(Some(now + Duration::seconds(30)));
        assert!(!t.is_expired(now));
        assert!(t.expires_within(now, Duration::seconds(60)));
        assert!(!token(None).expires_within(now, Duration::seconds(60)));
        assert!(token(Some(now - Duration::seconds(1))).is_expired(now));
    }

    #[test]
    fn test_scope_list() {
        assert_eq!(token(None).scope_list().len(), 2);
    }
}
