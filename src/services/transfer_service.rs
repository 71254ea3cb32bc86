//! Paquetes de vehículos entre instalaciones
//!
//! Un paquete es un zip con `manifest.json`, `data.json` y, opcionalmente,
//! los ficheros bajo `files/vehicles/<clave>/<nombre>`. La importación
//! procesa cada vehículo en su propia transacción: un vehículo que falla se
//! apunta en `errors` y no afecta a los demás.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::EnvironmentConfig;
use crate::database::schema_version;
use crate::domain::{copy_plate, normalize_plate, vehicle_storage_key};
use crate::dto::{
    ImportIdMap, ImportMode, ImportResult, PackageData, PackageFileEntry, PackageManifest,
    VehicleExportRequest,
};
use crate::models::{NewVehicleFile, Vehicle, VehicleFile};
use crate::repositories::{
    BranchRepository, EventRepository, ExpenseRepository, FileRepository, LinkRepository,
    TransferRepository, VehicleRepository, VisitRepository,
};
use crate::services::backup_service::generate_backup_id;
use crate::services::file_service::{remove_stored_files, vehicle_dir};
use crate::utils::archive::{run_blocking, safe_archive_path, sha256_bytes, zip_error};
use crate::utils::errors::{internal_error, unprocessable_error, AppError, AppResult};
use crate::utils::validation::{sanitize_file_name, unique_file_name};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data.json";
const VEHICLE_FILE_ENTRY: &str = "vehicle_file";

/// Paquete generado, listo para descargar
pub struct ExportedPackage {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub manifest: PackageManifest,
}

/// Contenido leído de un zip de importación
struct ParsedPackage {
    manifest: PackageManifest,
    data: PackageData,
    /// `export_path` → contenido
    files: HashMap<String, Vec<u8>>,
}

/// Ficheros escritos durante la importación de un vehículo, para poder
/// deshacerlos si la transacción falla. Al sobrescribir, los ficheros
/// anteriores del vehículo solo se borran tras el commit.
#[derive(Default)]
struct WrittenFiles {
    paths: Vec<PathBuf>,
    superseded: Option<(PathBuf, Vec<String>)>,
}

impl WrittenFiles {
    async fn rollback(self) {
        for path in &self.paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("No se pudo borrar {}: {}", path.display(), e);
            }
        }
    }

    async fn commit(self) {
        if let Some((dir, names)) = self.superseded {
            remove_stored_files(&dir, &names).await;
        }
    }
}

pub struct TransferService {
    pool: SqlitePool,
    storage_root: PathBuf,
    app_version: String,
    vehicles: VehicleRepository,
    branches: BranchRepository,
}

impl TransferService {
    pub fn new(pool: SqlitePool, config: &EnvironmentConfig) -> Self {
        Self {
            vehicles: VehicleRepository::new(pool.clone()),
            branches: BranchRepository::new(pool.clone()),
            storage_root: config.storage_root.clone(),
            app_version: config.app_version.clone(),
            pool,
        }
    }

    pub async fn export(&self, request: VehicleExportRequest) -> AppResult<ExportedPackage> {
        let mut plates: Vec<String> = request
            .vehicle_ids
            .iter()
            .filter_map(|id| normalize_plate(id))
            .collect();
        plates.sort();
        plates.dedup();

        let vehicles = self.vehicles.list_by_plates(&plates).await?;
        if vehicles.is_empty() {
            return Err(AppError::NotFound("Vehiculos no encontrados para exportar".to_string()));
        }
        let plates: Vec<String> = vehicles.iter().map(|v| v.license_plate.clone()).collect();

        let vehicle_files = FileRepository::new(self.pool.clone()).list_for_vehicles(&plates).await?;
        let (file_entries, sources, warnings) = self.collect_files(&vehicle_files);

        let data = PackageData {
            vehicles,
            vehicle_expenses: ExpenseRepository::new(self.pool.clone()).list_for_vehicles(&plates).await?,
            vehicle_visits: VisitRepository::new(self.pool.clone()).list_for_vehicles(&plates).await?,
            vehicle_links: LinkRepository::new(self.pool.clone()).list_for_vehicles(&plates).await?,
            vehicle_files,
            transfers: TransferRepository::new(self.pool.clone()).list_for_vehicles(&plates).await?,
            status_events: EventRepository::new(self.pool.clone())
                .list_status_events_for_vehicles(&plates)
                .await?,
            events: EventRepository::new(self.pool.clone())
                .list_events_for_vehicles(&plates)
                .await?,
            file_entries,
        };
        let data_json = serde_json::to_vec(&data).map_err(internal_error)?;

        let now = Utc::now();
        let manifest = PackageManifest {
            package_id: generate_backup_id(now),
            created_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            app_version: self.app_version.clone(),
            schema_version: schema_version(&self.pool).await?,
            vehicles_count: data.vehicles.len(),
            files_included: request.include_files,
            files_count: if request.include_files { sources.len() } else { 0 },
            data_sha256: sha256_bytes(&data_json),
            warnings,
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(internal_error)?;

        let include_files = request.include_files;
        let bytes = run_blocking(move || build_zip(&manifest_json, &data_json, &sources, include_files)).await?;

        info!(
            "Paquete exportado {}: {} vehiculos, {} archivos",
            manifest.package_id, manifest.vehicles_count, manifest.files_count
        );
        Ok(ExportedPackage {
            file_name: format!("sahocars_vehiculos_{}.zip", manifest.package_id),
            bytes,
            manifest,
        })
    }

    /// Entradas de fichero del paquete; los que faltan en disco se avisan
    fn collect_files(&self, files: &[VehicleFile]) -> (Vec<PackageFileEntry>, Vec<(String, PathBuf)>, Vec<String>) {
        let mut entries = Vec::new();
        let mut sources = Vec::new();
        let mut warnings = Vec::new();
        for file in files {
            let source = vehicle_dir(&self.storage_root, &file.vehicle_id).join(&file.stored_name);
            if !source.is_file() {
                warnings.push(format!("Archivo faltante: {}", source.display()));
                continue;
            }
            let export_path = package_file_path(&file.vehicle_id, &file.stored_name);
            entries.push(PackageFileEntry {
                export_path: export_path.clone(),
                entry_type: VEHICLE_FILE_ENTRY.to_string(),
                vehicle_id: file.vehicle_id.clone(),
                stored_name: file.stored_name.clone(),
                id: file.id,
            });
            sources.push((export_path, source));
        }
        entries.sort_by(|a, b| a.export_path.cmp(&b.export_path));
        sources.sort_by(|a, b| a.0.cmp(&b.0));
        (entries, sources, warnings)
    }

    pub async fn import(&self, upload: Vec<u8>, mode: &str) -> AppResult<ImportResult> {
        let mode: ImportMode = mode
            .parse()
            .map_err(|_| unprocessable_error("Modo de importacion invalido"))?;
        if upload.is_empty() {
            return Err(unprocessable_error("Archivo zip vacio"));
        }
        let package = run_blocking(move || parse_package(upload)).await?;
        if package.data.vehicles.is_empty() {
            return Err(unprocessable_error("Paquete sin vehiculos"));
        }

        let mut result = ImportResult {
            ok: true,
            imported: 0,
            skipped: 0,
            errors: Vec::new(),
            id_map: ImportIdMap::default(),
        };
        if !package.manifest.files_included && !package.data.vehicle_files.is_empty() {
            result
                .errors
                .push("Paquete sin archivos: se omitiran archivos adjuntos".to_string());
        }

        for incoming in &package.data.vehicles {
            let Some(source_plate) = normalize_plate(&incoming.license_plate) else {
                result.errors.push("Vehiculo sin matricula en el paquete".to_string());
                continue;
            };

            let existing = self.find_existing(incoming, &source_plate).await?;
            if existing.is_some() && mode == ImportMode::Skip {
                result.skipped += 1;
                continue;
            }

            match self
                .import_vehicle(&package, incoming, &source_plate, existing, mode, &mut result)
                .await
            {
                Ok(target_plate) => {
                    info!("Vehiculo importado: {} -> {}", source_plate, target_plate);
                    result.id_map.vehicles.insert(source_plate, target_plate);
                    result.imported += 1;
                }
                Err(e) => {
                    warn!("Importacion de {} fallida: {}", source_plate, e);
                    result.errors.push(format!("Vehiculo {}: {}", source_plate, e));
                }
            }
        }

        info!(
            "Importacion terminada: {} importados, {} omitidos, {} errores",
            result.imported,
            result.skipped,
            result.errors.len()
        );
        Ok(result)
    }

    /// Mismo vehículo: por VIN si lo trae, si no por matrícula y fecha de compra
    async fn find_existing(&self, incoming: &Vehicle, plate: &str) -> AppResult<Option<Vehicle>> {
        let vin = incoming.vin.trim();
        if !vin.is_empty() {
            return self.vehicles.find_by_vin(vin).await;
        }
        Ok(self
            .vehicles
            .find_by_plate(plate)
            .await?
            .filter(|v| v.purchase_date == incoming.purchase_date))
    }

    async fn import_vehicle(
        &self,
        package: &ParsedPackage,
        incoming: &Vehicle,
        source_plate: &str,
        existing: Option<Vehicle>,
        mode: ImportMode,
        result: &mut ImportResult,
    ) -> AppResult<String> {
        let branch_id = self.resolve_branch(incoming.branch_id, result).await?;
        let mut written = WrittenFiles::default();

        let outcome = async {
            let mut tx = self.pool.begin().await?;
            let now = Utc::now();

            let target_plate = match existing {
                Some(current) if mode == ImportMode::Overwrite => {
                    let plate = current.license_plate.clone();
                    let previous_files = FileRepository::stored_names(&mut tx, &plate).await?;
                    VehicleRepository::delete_related(&mut tx, &plate).await?;
                    let mut updated = incoming.clone();
                    updated.license_plate = plate.clone();
                    updated.branch_id = branch_id;
                    updated.created_at = current.created_at;
                    updated.updated_at = now;
                    VehicleRepository::save(&mut tx, &updated).await?;

                    written.superseded = Some((vehicle_dir(&self.storage_root, &plate), previous_files));
                    plate
                }
                _ => {
                    let plate = first_free_plate(&mut tx, source_plate).await?;
                    let mut created = incoming.clone();
                    created.license_plate = plate.clone();
                    created.branch_id = branch_id;
                    VehicleRepository::insert(&mut tx, &created).await?;
                    plate
                }
            };

            let file_ids = if package.manifest.files_included {
                self.import_files(&mut tx, package, source_plate, &target_plate, &mut written, result)
                    .await?
            } else {
                HashMap::new()
            };
            copy_records(&mut tx, &package.data, source_plate, &target_plate, &file_ids).await?;

            tx.commit().await?;
            Ok::<String, AppError>(target_plate)
        }
        .await;

        match outcome {
            Ok(plate) => {
                written.commit().await;
                Ok(plate)
            }
            Err(e) => {
                written.rollback().await;
                Err(e)
            }
        }
    }

    /// La sucursal del paquete si existe aquí; si no, la primera disponible
    async fn resolve_branch(&self, branch_id: i64, result: &mut ImportResult) -> AppResult<i64> {
        if self.branches.find_by_id(branch_id).await?.is_some() {
            return Ok(branch_id);
        }
        let fallback = self
            .branches
            .list()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| unprocessable_error("No hay sucursales para asignar el vehiculo"))?;
        result.errors.push(format!(
            "Sucursal {} no existe; se asigna {}",
            branch_id, fallback.name
        ));
        Ok(fallback.id)
    }

    /// Escribir los ficheros del vehículo y crear sus filas; devuelve el
    /// mapa id origen → id nuevo
    async fn import_files(
        &self,
        conn: &mut SqliteConnection,
        package: &ParsedPackage,
        source_plate: &str,
        target_plate: &str,
        written: &mut WrittenFiles,
        result: &mut ImportResult,
    ) -> AppResult<HashMap<i64, i64>> {
        let mut file_ids = HashMap::new();
        let dir = vehicle_dir(&self.storage_root, target_plate);

        for record in belonging_to(&package.data.vehicle_files, source_plate, |f| &f.vehicle_id) {
            let entry = package
                .data
                .file_entries
                .iter()
                .find(|e| e.entry_type == VEHICLE_FILE_ENTRY && e.id == record.id);
            let Some(entry) = entry else {
                result
                    .errors
                    .push(format!("Archivo no encontrado para vehicle_file {}", record.id));
                continue;
            };
            let Some(bytes) = package.files.get(&entry.export_path) else {
                result
                    .errors
                    .push(format!("Archivo faltante en el paquete: {}", entry.export_path));
                continue;
            };

            tokio::fs::create_dir_all(&dir).await?;
            let stored_name = unique_file_name(&dir, &sanitize_file_name(&record.stored_name));
            let path = dir.join(&stored_name);
            tokio::fs::write(&path, bytes).await?;
            written.paths.push(path);

            let new_file = NewVehicleFile {
                category: record.category,
                original_name: record.original_name.clone(),
                stored_name,
                mime_type: record.mime_type.clone(),
                size_bytes: bytes.len() as i64,
                notes: record.notes.clone(),
            };
            let created = FileRepository::insert(&mut *conn, target_plate, &new_file, record.created_at).await?;
            file_ids.insert(record.id, created.id);
            result
                .id_map
                .vehicle_files
                .insert(record.id.to_string(), created.id);
        }
        Ok(file_ids)
    }
}

/// Registros de `items` cuyo vehículo normalizado es `plate`
fn belonging_to<'a, T, F>(items: &'a [T], plate: &'a str, vehicle_id: F) -> impl Iterator<Item = &'a T> + 'a
where
    F: Fn(&T) -> &String + 'a,
{
    items
        .iter()
        .filter(move |item| normalize_plate(vehicle_id(item)).as_deref() == Some(plate))
}

/// Copiar gastos, visitas, enlaces, traslados y eventos al vehículo destino
async fn copy_records(
    conn: &mut SqliteConnection,
    data: &PackageData,
    source_plate: &str,
    target_plate: &str,
    file_ids: &HashMap<i64, i64>,
) -> AppResult<()> {
    for expense in belonging_to(&data.vehicle_expenses, source_plate, |e| &e.vehicle_id) {
        let mut copy = expense.clone();
        copy.vehicle_id = target_plate.to_string();
        copy.linked_vehicle_file_id = expense
            .linked_vehicle_file_id
            .and_then(|id| file_ids.get(&id).copied());
        ExpenseRepository::insert_copy(&mut *conn, &copy).await?;
    }
    for visit in belonging_to(&data.vehicle_visits, source_plate, |v| &v.vehicle_id) {
        let mut copy = visit.clone();
        copy.vehicle_id = target_plate.to_string();
        VisitRepository::insert_copy(&mut *conn, &copy).await?;
    }
    for link in belonging_to(&data.vehicle_links, source_plate, |l| &l.vehicle_id) {
        let mut copy = link.clone();
        copy.vehicle_id = target_plate.to_string();
        LinkRepository::insert_copy(&mut *conn, &copy).await?;
    }
    for transfer in belonging_to(&data.transfers, source_plate, |t| &t.vehicle_id) {
        let mut copy = transfer.clone();
        copy.vehicle_id = target_plate.to_string();
        TransferRepository::insert_copy(&mut *conn, &copy).await?;
    }
    for event in belonging_to(&data.status_events, source_plate, |e| &e.vehicle_id) {
        let mut copy = event.clone();
        copy.vehicle_id = target_plate.to_string();
        EventRepository::insert_status_event_copy(&mut *conn, &copy).await?;
    }
    for event in belonging_to(&data.events, source_plate, |e| &e.vehicle_id) {
        let mut copy = event.clone();
        copy.vehicle_id = target_plate.to_string();
        EventRepository::insert_event_copy(&mut *conn, &copy).await?;
    }
    Ok(())
}

/// Primera matrícula libre entre `<BASE>`, `<BASE>-C1`, `<BASE>-C2`...
async fn first_free_plate(conn: &mut SqliteConnection, base: &str) -> AppResult<String> {
    if !VehicleRepository::plate_taken(&mut *conn, base).await? {
        return Ok(base.to_string());
    }
    let mut n = 1;
    loop {
        let candidate = copy_plate(base, n);
        if !VehicleRepository::plate_taken(&mut *conn, &candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

fn build_zip(
    manifest_json: &[u8],
    data_json: &[u8],
    sources: &[(String, PathBuf)],
    include_files: bool,
) -> AppResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(MANIFEST_ENTRY, options).map_err(zip_error)?;
    writer.write_all(manifest_json)?;
    writer.start_file(DATA_ENTRY, options).map_err(zip_error)?;
    writer.write_all(data_json)?;

    if include_files {
        for (export_path, source) in sources {
            if safe_archive_path(export_path).is_none() {
                continue;
            }
            writer.start_file(export_path.as_str(), options).map_err(zip_error)?;
            writer.write_all(&std::fs::read(source)?)?;
        }
    }

    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn parse_package(upload: Vec<u8>) -> AppResult<ParsedPackage> {
    let mut archive =
        ZipArchive::new(Cursor::new(upload)).map_err(|_| unprocessable_error("Zip invalido"))?;

    let manifest: PackageManifest = read_json_entry(&mut archive, MANIFEST_ENTRY)?;
    let data: PackageData = read_json_entry(&mut archive, DATA_ENTRY)?;

    for entry in &data.file_entries {
        if safe_archive_path(&entry.export_path).is_none() {
            return Err(unprocessable_error("Ruta de archivo invalida"));
        }
    }

    let mut files = HashMap::new();
    if manifest.files_included {
        for entry in &data.file_entries {
            let mut file = match archive.by_name(&entry.export_path) {
                Ok(file) => file,
                Err(zip::result::ZipError::FileNotFound) => continue,
                Err(e) => return Err(zip_error(e).into()),
            };
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            files.insert(entry.export_path.clone(), bytes);
        }
    }

    Ok(ParsedPackage { manifest, data, files })
}

fn read_json_entry<T: serde::de::DeserializeOwned>(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    name: &str,
) -> AppResult<T> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| unprocessable_error(&format!("Falta {} en el paquete", name)))?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;
    serde_json::from_slice(&raw).map_err(|_| unprocessable_error(&format!("{} invalido", name)))
}

/// Ruta de un fichero de vehículo dentro del zip
pub fn package_file_path(plate: &str, stored_name: &str) -> String {
    format!("files/vehicles/{}/{}", vehicle_storage_key(plate), stored_name)
}
