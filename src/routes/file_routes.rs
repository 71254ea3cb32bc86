//! Rutas de ficheros de vehículo (subida multipart y descarga)

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use crate::dto::StatusResponse;
use crate::models::VehicleFile;
use crate::services::{FileService, UploadedFile};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, unprocessable_error, AppError};

/// Tamaño máximo de una subida
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct FileListQuery {
    category: Option<String>,
}

/// Ficheros de un vehículo, montados bajo `/vehicles`
pub fn create_file_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:vehicle_id/files",
            get(list_files)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/:vehicle_id/files/:file_id", delete(delete_file))
        .route("/:vehicle_id/files/:file_id/download", get(download_file))
}

async fn list_files(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<Vec<VehicleFile>>, AppError> {
    let service = FileService::new(state.pool.clone(), state.config.storage_root.clone());
    Ok(Json(service.list(&vehicle_id, query.category.as_deref()).await?))
}

/// Campos: `file` (obligatorio), `category` y `notes`
async fn upload_file(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<VehicleFile>), AppError> {
    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut category = None;
    let mut notes = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            Some("category") => category = Some(field.text().await.map_err(multipart_error)?),
            Some("notes") => notes = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| unprocessable_error("Falta el campo file"))?;
    let upload = UploadedFile {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
        category,
        notes,
    };

    let service = FileService::new(state.pool.clone(), state.config.storage_root.clone());
    let stored = service.upload(&vehicle_id, upload).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn delete_file(
    State(state): State<AppState>,
    Path((vehicle_id, file_id)): Path<(String, i64)>,
) -> Result<Json<StatusResponse>, AppError> {
    let service = FileService::new(state.pool.clone(), state.config.storage_root.clone());
    Ok(Json(service.delete(&vehicle_id, file_id).await?))
}

async fn download_file(
    State(state): State<AppState>,
    Path((vehicle_id, file_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let service = FileService::new(state.pool.clone(), state.config.storage_root.clone());
    let (file, bytes) = service.download(&vehicle_id, file_id).await?;
    let headers = [
        (header::CONTENT_TYPE, file.mime_type.clone()),
        (header::CONTENT_DISPOSITION, attachment_header(&file.original_name)),
    ];
    Ok((headers, bytes))
}

pub(crate) fn multipart_error(e: MultipartError) -> AppError {
    bad_request_error(&format!("Formulario multipart invalido: {}", e))
}

/// `Content-Disposition` con nombre ASCII y variante UTF-8 codificada
pub(crate) fn attachment_header(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_header() {
        assert_eq!(
            attachment_header("factura.pdf"),
            "attachment; filename=\"factura.pdf\"; filename*=UTF-8''factura.pdf"
        );
        let header = attachment_header("ficha técnica \"v2\".pdf");
        assert!(header.starts_with("attachment; filename=\"ficha_t_cnica__v2_.pdf\""));
        assert!(header.contains("filename*=UTF-8''ficha%20t%C3%A9cnica%20%22v2%22.pdf"));
    }
}
