//! Archivos de vehículo
//!
//! El contenido va a `<storage>/vehicles/<clave>/<nombre>` y los metadatos a
//! `vehicle_file`. Si falla la base de datos se borra el fichero recién
//! escrito.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::domain::vehicle_storage_key;
use crate::dto::StatusResponse;
use crate::models::file::MAX_PHOTOS_PER_VEHICLE;
use crate::models::{FileCategory, NewVehicleEvent, NewVehicleFile, VehicleEventType, VehicleFile};
use crate::repositories::{EventRepository, FileRepository};
use crate::services::vehicle_service::VehicleService;
use crate::utils::errors::{bad_request_error, not_found_error, unprocessable_error, AppResult};
use crate::utils::validation::{non_empty, sanitize_file_name, unique_file_name};

/// Fichero recibido en una subida multipart
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Carpeta de archivos de un vehículo
pub fn vehicle_dir(storage_root: &Path, plate: &str) -> PathBuf {
    storage_root.join("vehicles").join(vehicle_storage_key(plate))
}

/// Borra los ficheros `names` de `dir` y la carpeta solo si queda vacía.
///
/// Matrículas distintas pueden compartir carpeta (`AB 12` y `AB_12`), por eso
/// nunca se borra la carpeta entera.
pub async fn remove_stored_files(dir: &Path, names: &[String]) {
    for name in names {
        let path = dir.join(name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("No se pudo borrar {}: {}", path.display(), e);
            }
        }
    }

    let is_empty = match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
        Err(_) => false,
    };
    if is_empty {
        if let Err(e) = tokio::fs::remove_dir(dir).await {
            warn!("No se pudo borrar la carpeta {}: {}", dir.display(), e);
        }
    }
}

/// Categoría opcional de un parámetro de consulta o campo de formulario
pub fn parse_category(raw: Option<&str>) -> AppResult<Option<FileCategory>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<FileCategory>()
            .map(Some)
            .map_err(|_| bad_request_error("Categoria de archivo invalida")),
    }
}

pub struct FileService {
    pool: SqlitePool,
    vehicles: VehicleService,
    files: FileRepository,
    storage_root: PathBuf,
}

impl FileService {
    pub fn new(pool: SqlitePool, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            vehicles: VehicleService::new(pool.clone()),
            files: FileRepository::new(pool.clone()),
            storage_root: storage_root.into(),
            pool,
        }
    }

    pub async fn list(&self, identifier: &str, category: Option<&str>) -> AppResult<Vec<VehicleFile>> {
        let category = parse_category(category)?;
        let vehicle = self.vehicles.resolve(identifier).await?;
        self.files.list_for_vehicle(&vehicle.license_plate, category).await
    }

    pub async fn upload(&self, identifier: &str, upload: UploadedFile) -> AppResult<VehicleFile> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;

        let category = parse_category(upload.category.as_deref())?.unwrap_or(FileCategory::Document);
        if upload.bytes.is_empty() {
            return Err(unprocessable_error("Archivo vacio"));
        }
        if category == FileCategory::Photo {
            let photos = self.files.count_by_category(&plate, FileCategory::Photo).await?;
            if photos >= MAX_PHOTOS_PER_VEHICLE {
                return Err(bad_request_error(&format!(
                    "Limite de {} fotos alcanzado",
                    MAX_PHOTOS_PER_VEHICLE
                )));
            }
        }

        let dir = vehicle_dir(&self.storage_root, &plate);
        tokio::fs::create_dir_all(&dir).await?;
        let original_name = sanitize_file_name(&upload.file_name);
        let stored_name = unique_file_name(&dir, &original_name);
        let path = dir.join(&stored_name);
        tokio::fs::write(&path, &upload.bytes).await?;

        let new_file = NewVehicleFile {
            category,
            original_name,
            stored_name,
            mime_type: upload
                .content_type
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size_bytes: upload.bytes.len() as i64,
            notes: non_empty(upload.notes),
        };

        let now = Utc::now();
        let saved = async {
            let mut tx = self.pool.begin().await?;
            let file = FileRepository::insert(&mut tx, &plate, &new_file, now).await?;
            let event = NewVehicleEvent::new(
                VehicleEventType::FileUploaded,
                json!({ "id": file.id, "name": file.original_name, "category": file.category }),
            );
            EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
            tx.commit().await?;
            AppResult::Ok(file)
        }
        .await;

        match saved {
            Ok(file) => {
                info!("Archivo {} subido a {} ({} bytes)", file.stored_name, plate, file.size_bytes);
                Ok(file)
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!("No se pudo borrar {}: {}", path.display(), remove_err);
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, identifier: &str, file_id: i64) -> AppResult<StatusResponse> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;
        let file = self.find(&plate, file_id).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        FileRepository::delete(&mut tx, file.id).await?;
        let event = NewVehicleEvent::new(
            VehicleEventType::FileDeleted,
            json!({ "id": file.id, "name": file.original_name, "category": file.category }),
        );
        EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
        tx.commit().await?;

        let path = vehicle_dir(&self.storage_root, &plate).join(&file.stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("No se pudo borrar {}: {}", path.display(), e);
        }

        info!("Archivo {} eliminado de {}", file.id, plate);
        Ok(StatusResponse::ok())
    }

    /// Metadatos y contenido de un fichero
    pub async fn download(&self, identifier: &str, file_id: i64) -> AppResult<(VehicleFile, Vec<u8>)> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        let file = self.find(&vehicle.license_plate, file_id).await?;
        let path = vehicle_dir(&self.storage_root, &vehicle.license_plate).join(&file.stored_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found_error("Archivo"));
            }
            Err(e) => return Err(e.into()),
        };
        Ok((file, bytes))
    }

    async fn find(&self, plate: &str, file_id: i64) -> AppResult<VehicleFile> {
        self.files
            .find_for_vehicle(plate, file_id)
            .await?
            .ok_or_else(|| not_found_error("Archivo"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(parse_category(Some("")).unwrap(), None);
        assert_eq!(parse_category(Some("photo")).unwrap(), Some(FileCategory::Photo));
        assert!(parse_category(Some("video")).is_err());
    }

    #[test]
    fn test_vehicle_dir() {
        let dir = vehicle_dir(Path::new("/data/storage"), "1234 abc");
        assert_eq!(dir, PathBuf::from("/data/storage/vehicles/1234_ABC"));
    }
}
