//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno. Todas las variables tienen
//! un valor por defecto razonable para uso local; solo falla si un valor
//! existe pero no se puede interpretar.

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

const DEFAULT_BRANCHES: &str = "Montgat,Juneda";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} no es un valor valido: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Direccion de servidor invalida: {0}")]
    InvalidAddress(String),
}

/// Credenciales y destino de Google Calendar
#[derive(Debug, Clone, Default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub base_url: Option<String>,
    pub calendar_id: String,
}

impl GoogleConfig {
    /// `GOOGLE_REDIRECT_URI` o `<SAHOCARS_BASE_URL>/auth/google/callback`
    pub fn resolved_redirect_uri(&self) -> Option<String> {
        if let Some(uri) = &self.redirect_uri {
            return Some(uri.clone());
        }
        self.base_url
            .as_ref()
            .map(|base| format!("{}/auth/google/callback", base.trim_end_matches('/')))
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub database_url: String,
    pub storage_root: PathBuf,
    pub backup_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub admin_allow_remote: bool,
    pub app_version: String,
    pub app_branch: String,
    pub app_commit: String,
    pub default_branches: Vec<String>,
    pub google: GoogleConfig,
}

impl EnvironmentConfig {
    /// Leer la configuración de las variables de entorno del proceso
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Leer la configuración desde un mapa (útil en tests)
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = PathBuf::from(get("SAHOCARS_DATA_DIR").unwrap_or_else(|| "./data".to_string()));

        let port = match get("SAHOCARS_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "SAHOCARS_PORT",
                value: raw,
            })?,
            None => 8000,
        };

        let admin_allow_remote = match get("SAHOCARS_ADMIN_ALLOW_REMOTE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidValue {
                name: "SAHOCARS_ADMIN_ALLOW_REMOTE",
                value: raw,
            })?,
            None => false,
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| sqlite_url_for(&data_dir.join("db.sqlite")));
        let storage_root = resolve_under(&data_dir, get("STORAGE_ROOT"), "storage");
        let backup_dir = resolve_under(&data_dir, get("BACKUP_DIR"), "backups");

        Ok(Self {
            environment: get("SAHOCARS_ENV").unwrap_or_else(|| "dev".to_string()),
            host: get("SAHOCARS_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url,
            storage_root,
            backup_dir,
            cors_origins: split_list(&get("CORS_ORIGINS").unwrap_or_else(|| "*".to_string())),
            admin_allow_remote,
            app_version: get("SAHOCARS_APP_VERSION").unwrap_or_else(|| "dev".to_string()),
            app_branch: get("SAHOCARS_APP_BRANCH").unwrap_or_else(|| "local".to_string()),
            app_commit: get("SAHOCARS_APP_COMMIT").unwrap_or_else(|| "unknown".to_string()),
            default_branches: split_list(
                &get("SAHOCARS_DEFAULT_BRANCHES").unwrap_or_else(|| DEFAULT_BRANCHES.to_string()),
            ),
            google: GoogleConfig {
                client_id: get("GOOGLE_CLIENT_ID"),
                client_secret: get("GOOGLE_CLIENT_SECRET"),
                redirect_uri: get("GOOGLE_REDIRECT_URI"),
                base_url: get("SAHOCARS_BASE_URL"),
                calendar_id: get("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            },
            data_dir,
        })
    }

    /// Configuración local completa bajo un directorio de datos
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: sqlite_url_for(&data_dir.join("db.sqlite")),
            storage_root: data_dir.join("storage"),
            backup_dir: data_dir.join("backups"),
            cors_origins: vec!["*".to_string()],
            admin_allow_remote: false,
            app_version: "dev".to_string(),
            app_branch: "local".to_string(),
            app_commit: "unknown".to_string(),
            default_branches: split_list(DEFAULT_BRANCHES),
            google: GoogleConfig {
                calendar_id: "primary".to_string(),
                ..GoogleConfig::default()
            },
            data_dir,
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "dev" || self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "prod" || self.environment == "production"
    }

    /// Dirección de escucha del servidor
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::InvalidAddress(raw))
    }

    /// CORS totalmente abierto cuando la lista contiene `*`
    pub fn cors_is_permissive(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Las rutas relativas cuelgan del directorio de datos
fn resolve_under(data_dir: &Path, value: Option<String>, default: &str) -> PathBuf {
    match value {
        Some(raw) => {
            let path = PathBuf::from(raw);
            if path.is_absolute() {
                path
            } else {
                data_dir.join(path)
            }
        }
        None => data_dir.join(default),
    }
}

fn sqlite_url_for(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}
