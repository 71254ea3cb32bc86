//! Backups, restauración y vaciado del sistema
//!
//! Un backup son tres ficheros en `BACKUP_DIR`:
//! `backup_<id>.sqlite` (copia con `VACUUM INTO`), `backup_<id>.files.zip`
//! (el storage) y `backup_<id>.manifest.json`.
//!
//! La restauración sustituye el contenido de las tablas dentro de una única
//! transacción sobre la base de datos viva, así que el pool ve los datos
//! restaurados sin reiniciar.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, SqliteConnection, SqlitePool};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EnvironmentConfig;
use crate::database::schema_version;
use crate::dto::{
    BackupCreateRequest, BackupCreated, BackupListItem, BackupManifest, BackupRestoreRequest,
    RestoreResult, WipeRequest, WipeResult,
};
use crate::utils::archive::{extract_archive, run_blocking, sha256_file, zip_directory};
use crate::utils::errors::{
    conflict_error, internal_error, not_found_error, unprocessable_error, AppError, AppResult,
};

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = ".sqlite";
const FILES_ARCHIVE_SUFFIX: &str = ".files.zip";
const MANIFEST_SUFFIX: &str = ".manifest.json";
const BACKUP_METHOD: &str = "sqlite_vacuum_into";
const RESTORE_METHOD: &str = "attached_copy";
const RESTORE_IN_PROGRESS: &str = "restore_in_progress";

/// Tablas de datos de usuario, hijas antes que padres
pub const USER_TABLES: [&str; 10] = [
    "vehicle_event",
    "vehicle_status_event",
    "branch_transfer",
    "vehicle_expense",
    "vehicle_visit",
    "vehicle_link",
    "vehicle_file",
    "vehicle",
    "branch",
    "google_token",
];

/// Tablas sin `INTEGER PRIMARY KEY`: se copia también el rowid para que el
/// id numérico de compatibilidad sobreviva a la restauración
const ROWID_TABLES: [&str; 1] = ["vehicle"];

pub fn backup_file_name(id: &str) -> String {
    format!("{}{}{}", BACKUP_PREFIX, id, BACKUP_EXTENSION)
}

pub fn files_archive_name(id: &str) -> String {
    format!("{}{}{}", BACKUP_PREFIX, id, FILES_ARCHIVE_SUFFIX)
}

pub fn manifest_file_name(id: &str) -> String {
    format!("{}{}{}", BACKUP_PREFIX, id, MANIFEST_SUFFIX)
}

/// `YYYYmmdd_HHMMSS_<6 hex>`
pub fn generate_backup_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..6])
}

/// Los ids solo llevan dígitos, letras y `_`; cualquier otra cosa se trata
/// como inexistente
fn is_valid_backup_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct BackupService {
    pool: SqlitePool,
    backup_dir: PathBuf,
    storage_root: PathBuf,
    app_version: String,
    restore_lock: Arc<RwLock<()>>,
}

impl BackupService {
    pub fn new(pool: SqlitePool, config: &EnvironmentConfig, restore_lock: Arc<RwLock<()>>) -> Self {
        Self {
            pool,
            backup_dir: config.backup_dir.clone(),
            storage_root: config.storage_root.clone(),
            app_version: config.app_version.clone(),
            restore_lock,
        }
    }

    pub async fn create(&self, request: BackupCreateRequest) -> AppResult<BackupCreated> {
        let _guard = self
            .restore_lock
            .try_read()
            .map_err(|_| conflict_error(RESTORE_IN_PROGRESS))?;
        self.create_unlocked(request.include_files).await
    }

    async fn create_unlocked(&self, include_files: bool) -> AppResult<BackupCreated> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;

        let now = Utc::now();
        let id = generate_backup_id(now);
        let backup_path = self.backup_dir.join(backup_file_name(&id));
        let mut warnings = Vec::new();

        sqlx::query("VACUUM INTO ?1")
            .bind(backup_path.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        let integrity_check = integrity_check(&backup_path).await?;
        if integrity_check != "ok" {
            warnings.push(format!("Integrity check: {}", integrity_check));
        }

        let size_bytes = tokio::fs::metadata(&backup_path).await?.len();
        let sha256 = {
            let path = backup_path.clone();
            run_blocking(move || Ok(sha256_file(&path)?)).await?
        };

        let (files_filename, files_size_bytes, files_sha256) = if include_files {
            if !self.storage_root.exists() {
                warnings.push("Storage root no existe; backup de archivos vacio".to_string());
            }
            let archive_name = files_archive_name(&id);
            let archive_path = self.backup_dir.join(&archive_name);
            let storage_root = self.storage_root.clone();
            let (size, hash) = run_blocking(move || {
                zip_directory(&storage_root, &archive_path)?;
                let size = std::fs::metadata(&archive_path)?.len();
                Ok((size, sha256_file(&archive_path)?))
            })
            .await?;
            (Some(archive_name), Some(size), Some(hash))
        } else {
            (None, None, None)
        };

        let manifest = BackupManifest {
            id: id.clone(),
            filename: backup_file_name(&id),
            created_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            size_bytes,
            sha256,
            db_engine: "sqlite".to_string(),
            app_version: self.app_version.clone(),
            schema_version: schema_version(&self.pool).await?,
            backup_method: Some(BACKUP_METHOD.to_string()),
            restore_method: Some(RESTORE_METHOD.to_string()),
            integrity_check,
            files_included: include_files,
            files_filename,
            files_size_bytes,
            files_sha256,
            warnings,
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(internal_error)?;
        tokio::fs::write(self.backup_dir.join(manifest_file_name(&id)), manifest_json).await?;

        info!("Backup creado: {} ({} bytes)", id, manifest.size_bytes);
        Ok(BackupCreated::from(manifest))
    }

    /// Backups existentes, el más reciente primero
    pub async fn list(&self) -> AppResult<Vec<BackupListItem>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.backup_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(id) = name
                .strip_prefix(BACKUP_PREFIX)
                .and_then(|rest| rest.strip_suffix(BACKUP_EXTENSION))
            else {
                continue;
            };
            items.push(self.list_item(id, &entry.path()).await?);
        }

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn list_item(&self, id: &str, backup_path: &Path) -> AppResult<BackupListItem> {
        if let Some(manifest) = read_manifest(&self.backup_dir.join(manifest_file_name(id))).await {
            return Ok(BackupListItem {
                id: id.to_string(),
                filename: manifest.filename.clone(),
                created_at: manifest.created_at.clone(),
                size_bytes: manifest.size_bytes,
                sha256: Some(manifest.sha256.clone()),
                files_included: manifest.files_included,
                files_filename: manifest.files_filename.clone(),
                files_size_bytes: manifest.files_size_bytes,
                files_sha256: manifest.files_sha256.clone(),
                manifest: Some(manifest),
                incomplete: false,
            });
        }

        let metadata = tokio::fs::metadata(backup_path).await?;
        let created_at = metadata
            .modified()
            .map(|modified| DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        let archive_name = files_archive_name(id);
        let archive_size = tokio::fs::metadata(self.backup_dir.join(&archive_name))
            .await
            .ok()
            .map(|m| m.len());

        Ok(BackupListItem {
            id: id.to_string(),
            filename: backup_file_name(id),
            created_at,
            size_bytes: metadata.len(),
            sha256: None,
            manifest: None,
            files_included: archive_size.is_some(),
            files_filename: archive_size.map(|_| archive_name),
            files_size_bytes: archive_size,
            files_sha256: None,
            incomplete: true,
        })
    }

    pub async fn restore(&self, id: &str, request: BackupRestoreRequest) -> AppResult<RestoreResult> {
        let _guard = self
            .restore_lock
            .try_write()
            .map_err(|_| conflict_error(RESTORE_IN_PROGRESS))?;

        if !is_valid_backup_id(id) {
            return Err(not_found_error("Backup"));
        }
        let backup_path = self.backup_dir.join(backup_file_name(id));
        if !backup_path.exists() {
            return Err(not_found_error("Backup"));
        }
        let manifest = read_manifest(&self.backup_dir.join(manifest_file_name(id))).await;
        let archive_path = self.backup_dir.join(files_archive_name(id));

        let mut warnings = self.validate(&backup_path, manifest.as_ref()).await?;
        let files_included = manifest.as_ref().is_some_and(|m| m.files_included);
        if files_included {
            warnings.extend(validate_files_archive(&archive_path, manifest.as_ref()).await?);
        }
        if request.wipe_before_restore && !request.confirm_wipe {
            return Err(unprocessable_error("confirm_wipe es requerido para vaciar antes de restaurar"));
        }

        if request.dry_run {
            return Ok(RestoreResult {
                ok: true,
                dry_run: true,
                restored: false,
                requires_restart: false,
                message: "Backup valido para restauracion".to_string(),
                safety_backup_id: None,
                warnings,
            });
        }

        let safety = self.create_unlocked(true).await?;
        info!("Backup de seguridad previo a restauracion: {}", safety.id);

        let staged_storage = if files_included {
            let staging = sibling_path(&self.storage_root, &format!("restore_{}", id));
            let target = staging.clone();
            let archive = archive_path.clone();
            let extracted = run_blocking(move || {
                if target.exists() {
                    std::fs::remove_dir_all(&target)?;
                }
                extract_archive(File::open(&archive)?, &target)
            })
            .await;
            match extracted {
                Ok(count) => {
                    info!("Archivos preparados para restaurar: {}", count);
                    Some(staging)
                }
                Err(e) => {
                    remove_dir_quietly(&staging).await;
                    return Err(e);
                }
            }
        } else {
            None
        };

        let failed = |e: AppError| {
            conflict_error(&format!(
                "Restore fallido. Puedes recuperar con el backup de seguridad {}. Error: {}",
                safety.id, e
            ))
        };

        match replace_database(&self.pool, &backup_path).await {
            Ok(table_warnings) => warnings.extend(table_warnings),
            Err(e) => {
                if let Some(staging) = &staged_storage {
                    remove_dir_quietly(staging).await;
                }
                return Err(failed(e.into()));
            }
        }

        if let Some(staging) = &staged_storage {
            if let Err(e) = self.swap_storage(staging, id).await {
                remove_dir_quietly(staging).await;
                return Err(failed(e.into()));
            }
        } else if request.wipe_before_restore {
            self.empty_storage().await?;
        }

        info!("Restauracion completada desde el backup {}", id);
        Ok(RestoreResult {
            ok: true,
            dry_run: false,
            restored: true,
            requires_restart: false,
            message: "Restauracion completada".to_string(),
            safety_backup_id: Some(safety.id),
            warnings,
        })
    }

    /// Borrar todos los datos y archivos; el esquema y el historial de
    /// migraciones se mantienen
    pub async fn wipe(&self, request: WipeRequest) -> AppResult<WipeResult> {
        if !request.confirm_wipe {
            return Err(unprocessable_error("confirm_wipe es requerido"));
        }
        let _guard = self
            .restore_lock
            .try_write()
            .map_err(|_| conflict_error(RESTORE_IN_PROGRESS))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("PRAGMA defer_foreign_keys = ON").execute(&mut *tx).await?;
        for table in USER_TABLES {
            sqlx::query(&format!("DELETE FROM {}", table)).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM sqlite_sequence").execute(&mut *tx).await?;
        tx.commit().await?;

        self.empty_storage().await?;

        warn!("Sistema vaciado: datos y archivos eliminados");
        Ok(WipeResult {
            ok: true,
            message: "Sistema vaciado correctamente".to_string(),
        })
    }

    async fn validate(&self, backup_path: &Path, manifest: Option<&BackupManifest>) -> AppResult<Vec<String>> {
        let mut warnings = Vec::new();
        let Some(manifest) = manifest else {
            warnings.push("Manifest no encontrado o invalido".to_string());
            return Ok(warnings);
        };

        if manifest.sha256.is_empty() {
            warnings.push("Manifest sin hash".to_string());
        } else {
            let path = backup_path.to_path_buf();
            let actual = run_blocking(move || Ok(sha256_file(&path)?)).await?;
            if actual != manifest.sha256 {
                return Err(conflict_error("El hash del backup no coincide"));
            }
        }

        let integrity = integrity_check(backup_path).await?;
        if integrity != "ok" {
            warnings.push(format!("Integrity check: {}", integrity));
        }
        Ok(warnings)
    }

    /// Sustituir el storage por el extraído; si algo falla se deja el
    /// anterior en su sitio
    async fn swap_storage(&self, staged: &Path, id: &str) -> std::io::Result<()> {
        let previous = sibling_path(&self.storage_root, &format!("old_{}", id));
        let had_previous = self.storage_root.exists();
        if had_previous {
            tokio::fs::rename(&self.storage_root, &previous).await?;
        }
        if let Err(e) = tokio::fs::rename(staged, &self.storage_root).await {
            if had_previous {
                tokio::fs::rename(&previous, &self.storage_root).await?;
            }
            return Err(e);
        }
        if had_previous {
            remove_dir_quietly(&previous).await;
        }
        Ok(())
    }

    async fn empty_storage(&self) -> AppResult<()> {
        if self.storage_root.exists() {
            tokio::fs::remove_dir_all(&self.storage_root).await?;
        }
        tokio::fs::create_dir_all(&self.storage_root).await?;
        Ok(())
    }
}

async fn validate_files_archive(archive_path: &Path, manifest: Option<&BackupManifest>) -> AppResult<Vec<String>> {
    let mut warnings = Vec::new();
    if !archive_path.exists() {
        return Err(AppError::NotFound("Backup de archivos no encontrado".to_string()));
    }
    match manifest.and_then(|m| m.files_sha256.clone()) {
        Some(expected) => {
            let path = archive_path.to_path_buf();
            let actual = run_blocking(move || Ok(sha256_file(&path)?)).await?;
            if actual != expected {
                return Err(conflict_error("El hash del backup de archivos no coincide"));
            }
        }
        None => warnings.push("Manifest sin hash de archivos".to_string()),
    }
    Ok(warnings)
}

async fn read_manifest(path: &Path) -> Option<BackupManifest> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&raw) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("Manifest ilegible {}: {}", path.display(), e);
            None
        }
    }
}

/// `PRAGMA integrity_check` sobre un fichero de backup
async fn integrity_check(path: &Path) -> Result<String, sqlx::Error> {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Delete)
        .connect()
        .await?;
    let result: Option<String> = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_optional(&mut conn)
        .await?;
    conn.close().await?;
    Ok(result.unwrap_or_else(|| "unknown".to_string()))
}

/// Copiar todas las tablas de usuario del backup adjunto a la base viva
async fn replace_database(pool: &SqlitePool, backup_path: &Path) -> Result<Vec<String>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    sqlx::query("ATTACH DATABASE ?1 AS bk")
        .bind(backup_path.to_string_lossy().into_owned())
        .execute(&mut *conn)
        .await?;

    let result = copy_tables(&mut conn).await;

    if let Err(e) = sqlx::query("DETACH DATABASE bk").execute(&mut *conn).await {
        warn!("No se pudo desadjuntar el backup: {}", e);
    }
    result
}

async fn copy_tables(conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let mut warnings = Vec::new();
    let mut tx = conn.begin().await?;
    sqlx::query("PRAGMA defer_foreign_keys = ON").execute(&mut *tx).await?;

    for table in USER_TABLES {
        sqlx::query(&format!("DELETE FROM main.{}", table))
            .execute(&mut *tx)
            .await?;
    }

    for table in USER_TABLES.iter().rev() {
        let target = table_columns(&mut tx, "main", table).await?;
        let source = table_columns(&mut tx, "bk", table).await?;
        if source.is_empty() {
            warnings.push(format!("Tabla {} ausente en el backup", table));
            continue;
        }
        let mut columns: Vec<String> = target
            .iter()
            .filter(|column| source.contains(column))
            .map(|column| format!("\"{}\"", column))
            .collect();
        if ROWID_TABLES.contains(table) {
            columns.insert(0, "rowid".to_string());
        }
        let list = columns.join(", ");
        let copied = sqlx::query(&format!(
            "INSERT INTO main.{table} ({list}) SELECT {list} FROM bk.{table}"
        ))
        .execute(&mut *tx)
        .await?
        .rows_affected();
        info!("Tabla {} restaurada: {} filas", table, copied);
    }

    tx.commit().await?;
    Ok(warnings)
}

async fn table_columns(conn: &mut SqliteConnection, schema: &str, table: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT name FROM pragma_table_info(?1, ?2)")
        .bind(table)
        .bind(schema)
        .fetch_all(conn)
        .await
}

/// Ruta hermana de `path` (mismo sistema de ficheros, el rename es atómico)
fn sibling_path(path: &Path, tag: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "storage".to_string());
    path.with_file_name(format!(".{}.{}", name, tag))
}

async fn remove_dir_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("No se pudo borrar {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backup_file_names() {
        assert_eq!(backup_file_name("20240101_120000_abc123"), "backup_20240101_120000_abc123.sqlite");
        assert_eq!(files_archive_name("x"), "backup_x.files.zip");
        assert_eq!(manifest_file_name("x"), "backup_x.manifest.json");
    }

    #[test]
    fn test_generate_backup_id() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 1).unwrap();
        let id = generate_backup_id(now);
        assert!(id.starts_with("20240305_090701_"));
        assert_eq!(id.len(), "20240305_090701_".len() + 6);
        assert!(is_valid_backup_id(&id));
        assert!(!is_valid_backup_id("../x"));
    }

    #[test]
    fn test_sibling_path() {
        let sibling = sibling_path(Path::new("/data/storage"), "old_1");
        assert_eq!(sibling, PathBuf::from("/data/.storage.old_1"));
    }
}
