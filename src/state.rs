//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::config::environment::EnvironmentConfig;

/// Vida máxima de un `state` OAuth pendiente
const OAUTH_STATE_TTL_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<EnvironmentConfig>,
    pub http_client: Client,
    /// `state` OAuth emitidos y aún no consumidos
    pub oauth_states: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    /// Restauración y vaciado toman escritura; los backups, lectura
    pub restore_lock: Arc<RwLock<()>>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: EnvironmentConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            http_client: Client::new(),
            oauth_states: Arc::new(RwLock::new(HashMap::new())),
            restore_lock: Arc::new(RwLock::new(())),
        }
    }

    /// Guardar un `state` OAuth recién emitido
    pub async fn store_oauth_state(&self, state: String) {
        let mut states = self.oauth_states.write().await;
        let now = Utc::now();
        states.retain(|_, issued| now - *issued < Duration::minutes(OAUTH_STATE_TTL_MINUTES));
        states.insert(state, now);
    }

    /// Consumir un `state` OAuth: solo vale una vez y dentro de su vida
    pub async fn take_oauth_state(&self, state: &str) -> bool {
        let mut states = self.oauth_states.write().await;
        match states.remove(state) {
            Some(issued) => Utc::now() - issued < Duration::minutes(OAUTH_STATE_TTL_MINUTES),
            None => false,
        }
    }
}
