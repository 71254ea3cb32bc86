//! Exportación CSV de vehículos, gastos y ventas
//!
//! Las comas dentro de un valor se sustituyen por espacios; no hay comillas.

use std::fmt::Display;

use sqlx::SqlitePool;

use crate::domain::VehicleStatus;
use crate::models::{Vehicle, VehicleExpense};
use crate::repositories::{ExpenseRepository, VehicleRepository};
use crate::utils::errors::{AppError, AppResult};

const VEHICLE_HEADERS: [&str; 15] = [
    "id",
    "vin",
    "license_plate",
    "brand",
    "model",
    "version",
    "year",
    "km",
    "color",
    "branch_id",
    "status",
    "purchase_price",
    "purchase_date",
    "sale_price",
    "sale_date",
];

const EXPENSE_HEADERS: [&str; 8] = [
    "id",
    "vehicle_id",
    "category",
    "amount",
    "currency",
    "date",
    "vendor",
    "notes",
];

const SALE_HEADERS: [&str; 5] = ["vehicle_id", "sale_price", "sale_date", "sold_at", "notes"];

/// Recursos exportables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResource {
    Vehicles,
    Expenses,
    Sales,
}

impl ExportResource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "vehicles" => Some(ExportResource::Vehicles),
            "expenses" => Some(ExportResource::Expenses),
            "sales" => Some(ExportResource::Sales),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportResource::Vehicles => "vehicles",
            ExportResource::Expenses => "expenses",
            ExportResource::Sales => "sales",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportResource::Vehicles => "vehicles.csv",
            ExportResource::Expenses => "expenses.csv",
            ExportResource::Sales => "sales.csv",
        }
    }
}

pub struct ExportService {
    vehicles: VehicleRepository,
    expenses: ExpenseRepository,
}

impl ExportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleRepository::new(pool.clone()),
            expenses: ExpenseRepository::new(pool),
        }
    }

    pub async fn export(&self, resource: &str) -> AppResult<(ExportResource, String)> {
        let resource = ExportResource::parse(resource)
            .ok_or_else(|| AppError::NotFound("Recurso de exportacion no encontrado".to_string()))?;
        let csv = match resource {
            ExportResource::Vehicles => vehicles_csv(&self.vehicles.list_all().await?),
            ExportResource::Expenses => expenses_csv(&self.expenses.list_all().await?),
            ExportResource::Sales => sales_csv(&self.vehicles.list_all().await?),
        };
        Ok((resource, csv))
    }
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn line(values: Vec<String>) -> String {
    values
        .iter()
        .map(|v| v.replace(',', " "))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn vehicles_csv(vehicles: &[Vehicle]) -> String {
    let mut lines = vec![VEHICLE_HEADERS.join(",")];
    for v in vehicles {
        lines.push(line(vec![
            v.id.to_string(),
            v.vin.clone(),
            v.license_plate.clone(),
            v.brand.clone(),
            v.model.clone(),
            cell(v.version.as_deref()),
            v.year.to_string(),
            v.km.to_string(),
            cell(v.color.as_deref()),
            v.branch_id.to_string(),
            v.status.to_string(),
            cell(v.purchase_price),
            v.purchase_date.to_string(),
            cell(v.sale_price),
            cell(v.sale_date),
        ]));
    }
    lines.join("\n")
}

pub fn expenses_csv(expenses: &[VehicleExpense]) -> String {
    let mut lines = vec![EXPENSE_HEADERS.join(",")];
    for e in expenses {
        lines.push(line(vec![
            e.id.to_string(),
            e.vehicle_id.clone(),
            e.category.to_string(),
            e.amount.to_string(),
            e.currency.clone(),
            e.date.to_string(),
            cell(e.vendor.as_deref()),
            cell(e.notes.as_deref()),
        ]));
    }
    lines.join("\n")
}

/// Vehículos vendidos, por fecha de venta
pub fn sales_csv(vehicles: &[Vehicle]) -> String {
    let mut sold: Vec<&Vehicle> = vehicles
        .iter()
        .filter(|v| v.status == VehicleStatus::Sold && v.sale_price.is_some())
        .collect();
    sold.sort_by_key(|v| (v.sale_date.or(v.sold_at), v.license_plate.clone()));

    let mut lines = vec![SALE_HEADERS.join(",")];
    for v in sold {
        lines.push(line(vec![
            v.license_plate.clone(),
            cell(v.sale_price),
            cell(v.sale_date),
            cell(v.sold_at),
            cell(v.sale_notes.as_deref()),
        ]));
    }
    lines.join("\n")
}
