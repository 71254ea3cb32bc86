//! DTOs de administración: backups, restauración, vaciado, paquetes de
//! vehículos y estado del sistema.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    BranchTransfer, Vehicle, VehicleEvent, VehicleExpense, VehicleFile, VehicleLink,
    VehicleStatusEvent, VehicleVisit,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupCreateRequest {
    #[serde(default = "default_true")]
    pub include_files: bool,
}

impl Default for BackupCreateRequest {
    fn default() -> Self {
        Self { include_files: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRestoreRequest {
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default)]
    pub wipe_before_restore: bool,
    #[serde(default)]
    pub confirm_wipe: bool,
}

impl Default for BackupRestoreRequest {
    fn default() -> Self {
        Self {
            dry_run: true,
            wipe_before_restore: false,
            confirm_wipe: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WipeRequest {
    #[serde(default)]
    pub confirm_wipe: bool,
}

/// Manifest escrito junto a cada backup (`backup_<id>.manifest.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub id: String,
    pub filename: String,
    pub created_at: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub db_engine: String,
    pub app_version: String,
    pub schema_version: String,
    #[serde(default)]
    pub backup_method: Option<String>,
    #[serde(default)]
    pub restore_method: Option<String>,
    pub integrity_check: String,
    pub files_included: bool,
    pub files_filename: Option<String>,
    pub files_size_bytes: Option<u64>,
    pub files_sha256: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Respuesta de `POST /admin/backups`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupCreated {
    pub id: String,
    pub filename: String,
    pub created_at: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub manifest: BackupManifest,
    pub files_included: bool,
    pub files_filename: Option<String>,
    pub files_size_bytes: Option<u64>,
    pub files_sha256: Option<String>,
    pub warnings: Vec<String>,
}

impl From<BackupManifest> for BackupCreated {
    fn from(manifest: BackupManifest) -> Self {
        Self {
            id: manifest.id.clone(),
            filename: manifest.filename.clone(),
            created_at: manifest.created_at.clone(),
            size_bytes: manifest.size_bytes,
            sha256: manifest.sha256.clone(),
            files_included: manifest.files_included,
            files_filename: manifest.files_filename.clone(),
            files_size_bytes: manifest.files_size_bytes,
            files_sha256: manifest.files_sha256.clone(),
            warnings: manifest.warnings.clone(),
            manifest,
        }
    }
}

/// Elemento de `GET /admin/backups`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupListItem {
    pub id: String,
    pub filename: String,
    pub created_at: String,
    pub size_bytes: u64,
    pub sha256: Option<String>,
    pub manifest: Option<BackupManifest>,
    pub files_included: bool,
    pub files_filename: Option<String>,
    pub files_size_bytes: Option<u64>,
    pub files_sha256: Option<String>,
    pub incomplete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreResult {
    pub ok: bool,
    pub dry_run: bool,
    pub restored: bool,
    pub requires_restart: bool,
    pub message: String,
    pub safety_backup_id: Option<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WipeResult {
    pub ok: bool,
    pub message: String,
}

/// Request de `POST /admin/vehicles/export`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleExportRequest {
    pub vehicle_ids: Vec<String>,
    #[serde(default = "default_true")]
    pub include_files: bool,
}

/// Modo de importación cuando el vehículo ya existe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    Skip,
    Overwrite,
    NewCopy,
}

impl std::str::FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "skip" => Ok(ImportMode::Skip),
            "overwrite" => Ok(ImportMode::Overwrite),
            "new_copy" => Ok(ImportMode::NewCopy),
            other => Err(other.to_string()),
        }
    }
}

/// `manifest.json` de un paquete de vehículos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub package_id: String,
    pub created_at: String,
    pub app_version: String,
    pub schema_version: String,
    pub vehicles_count: usize,
    pub files_included: bool,
    pub files_count: usize,
    pub data_sha256: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Fichero incluido en un paquete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageFileEntry {
    pub export_path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub vehicle_id: String,
    pub stored_name: String,
    pub id: i64,
}

/// `data.json` de un paquete de vehículos
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageData {
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub vehicle_expenses: Vec<VehicleExpense>,
    #[serde(default)]
    pub vehicle_visits: Vec<VehicleVisit>,
    #[serde(default)]
    pub vehicle_links: Vec<VehicleLink>,
    #[serde(default)]
    pub vehicle_files: Vec<VehicleFile>,
    #[serde(default)]
    pub transfers: Vec<BranchTransfer>,
    #[serde(default)]
    pub status_events: Vec<VehicleStatusEvent>,
    #[serde(default)]
    pub events: Vec<VehicleEvent>,
    #[serde(default)]
    pub file_entries: Vec<PackageFileEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportIdMap {
    pub vehicles: BTreeMap<String, String>,
    pub vehicle_files: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub ok: bool,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub id_map: ImportIdMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthChecks {
    pub db_readwrite: bool,
    pub storage_readwrite: bool,
    pub backups_readwrite: bool,
    pub migrations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub checks: HealthChecks,
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub app_version: String,
    pub branch: String,
    pub commit: String,
    pub env: String,
    pub schema_version: String,
}

/// Respuesta de `GET /auth/google/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleStatusResponse {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GoogleStatusResponse {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            expired: None,
            scopes: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_request_defaults_to_dry_run() {
        let request: BackupRestoreRequest = serde_json::from_str("{}").unwrap();
        assert!(request.dry_run);
        assert!(!request.wipe_before_restore);
        assert!(!request.confirm_wipe);
    }

    #[test]
    fn test_import_mode_parse() {
        assert_eq!("new_copy".parse::<ImportMode>(), Ok(ImportMode::NewCopy));
        assert!("replace".parse::<ImportMode>().is_err());
    }
}
