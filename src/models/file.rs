//! Modelo de VehicleFile
//!
//! Ficheros subidos para un vehículo. El contenido vive en disco bajo
//! `<storage>/vehicles/<clave>/<stored_name>`; aquí solo los metadatos.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Máximo de fotos por vehículo
pub const MAX_PHOTOS_PER_VEHICLE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum FileCategory {
    Document,
    Expense,
    Photo,
    SaleDocument,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Document => "document",
            FileCategory::Expense => "expense",
            FileCategory::Photo => "photo",
            FileCategory::SaleDocument => "sale_document",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(FileCategory::Document),
            "expense" => Ok(FileCategory::Expense),
            "photo" => Ok(FileCategory::Photo),
            "sale_document" => Ok(FileCategory::SaleDocument),
            other => Err(format!("Categoria de archivo invalida: {}", other)),
        }
    }
}

/// VehicleFile principal - mapea exactamente a la tabla vehicle_file
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleFile {
    pub id: i64,
    pub vehicle_id: String,
    pub category: FileCategory,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadatos de un fichero recién guardado en disco
#[derive(Debug, Clone)]
pub struct NewVehicleFile {
    pub category: FileCategory,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub notes: Option<String>,
}
