//! DTOs de informes y dashboard

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{normalize_plate, VehicleStatus};
use crate::utils::errors::{bad_request_error, AppResult};

/// Filtros comunes de `/reports/*`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub branch_id: Option<i64>,
    pub status: Option<String>,
    pub vehicle_id: Option<String>,
}

/// Filtros ya interpretados
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub branch_id: Option<i64>,
    pub status: Option<VehicleStatus>,
    pub vehicle_id: Option<String>,
}

impl ReportQuery {
    /// Estado desconocido → 400 "Estado invalido"
    pub fn into_filters(self) -> AppResult<ReportFilters> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<VehicleStatus>()
                    .map_err(|_| bad_request_error("Estado invalido"))?,
            ),
        };
        Ok(ReportFilters {
            from: self.from,
            to: self.to,
            branch_id: self.branch_id,
            status,
            vehicle_id: self.vehicle_id.as_deref().and_then(normalize_plate),
        })
    }
}

impl ReportFilters {
    /// ¿La fecha cae dentro de la ventana `from..=to`?
    ///
    /// Sin fecha solo pasa si no hay ventana.
    pub fn in_window(&self, date: Option<NaiveDate>) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub filters: ReportFilters,
    pub vehicles_total: i64,
    pub vehicles_sold: i64,
    pub vehicles_published: i64,
    pub vehicles_in_stock: i64,
    pub total_income: f64,
    pub total_purchase: f64,
    pub total_expenses: f64,
    pub total_profit: f64,
    pub avg_profit_per_sold: Option<f64>,
    pub avg_margin_pct: Option<f64>,
    pub avg_days_to_sell: Option<f64>,
    pub avg_days_in_stock: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleReportRow {
    pub vehicle_id: String,
    pub title: String,
    pub branch_id: i64,
    pub branch: Option<String>,
    pub status: VehicleStatus,
    pub purchase_price: f64,
    pub total_expenses: f64,
    pub sale_price: Option<f64>,
    pub sold_at: Option<NaiveDate>,
    pub profit: Option<f64>,
    pub margin_pct: Option<f64>,
    pub days_in_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchReportRow {
    pub branch_id: i64,
    pub branch_name: String,
    pub sold: i64,
    pub income: f64,
    pub profit: f64,
    pub vehicles_in_stock: i64,
    pub avg_days_in_stock: Option<f64>,
}

/// Filtros de `GET /dashboard`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    #[serde(alias = "location_id")]
    pub branch_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub vehicles: i64,
    pub income: f64,
    pub expenses: f64,
    pub margin: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invalid_status_is_bad_request() {
        let query = ReportQuery {
            status: Some("flying".to_string()),
            ..Default::default()
        };
        let err = query.into_filters().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_vehicle_id_is_normalized() {
        let query = ReportQuery {
            vehicle_id: Some(" 1234abc ".to_string()),
            status: Some("sold".to_string()),
            ..Default::default()
        };
        let filters = query.into_filters().unwrap();
        assert_eq!(filters.vehicle_id.as_deref(), Some("1234ABC"));
        assert_eq!(filters.status, Some(VehicleStatus::Sold));
    }

    #[test]
    fn test_in_window() {
        let open = ReportFilters::default();
        assert!(open.in_window(None));

        let filters = ReportFilters {
            from: Some(date(2024, 1, 1)),
            to: Some(date(2024, 1, 31)),
            ..Default::default()
        };
        assert!(filters.in_window(Some(date(2024, 1, 15))));
        assert!(filters.in_window(Some(date(2024, 1, 31))));
        assert!(!filters.in_window(Some(date(2024, 2, 1))));
        assert!(!filters.in_window(None));
    }
}
