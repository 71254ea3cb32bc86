//! Informes y dashboard
//!
//! Se calculan en memoria sobre los vehículos y gastos cargados. Reglas:
//! - vendidos = estado `sold` con `sold_at` dentro de la ventana de fechas
//! - la compra (PURCHASE) de los vendidos cuenta entera, sin filtro de fecha
//! - el resto de gastos se filtra por la fecha del gasto
//! - en stock = ni vendido ni descartado

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::domain::finance::purchase_total;
use crate::domain::{ExpenseAmount, VehicleStatus};
use crate::dto::{
    BranchReportRow, DashboardQuery, DashboardSummary, KpiReport, ReportFilters, VehicleReportRow,
};
use crate::models::{Vehicle, VehicleExpense};
use crate::repositories::{BranchRepository, ExpenseRepository, VehicleRepository};
use crate::utils::errors::AppResult;

pub struct ReportService {
    vehicles: VehicleRepository,
    expenses: ExpenseRepository,
    branches: BranchRepository,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleRepository::new(pool.clone()),
            expenses: ExpenseRepository::new(pool.clone()),
            branches: BranchRepository::new(pool),
        }
    }

    pub async fn kpis(&self, filters: ReportFilters) -> AppResult<KpiReport> {
        let data = self.load().await?;
        Ok(compute_kpis(&data, filters, Utc::now().date_naive()))
    }

    pub async fn vehicles(&self, filters: ReportFilters) -> AppResult<Vec<VehicleReportRow>> {
        let data = self.load().await?;
        let branch_names = self.branch_names().await?;
        Ok(vehicle_rows(&data, &filters, &branch_names, Utc::now().date_naive()))
    }

    pub async fn by_branch(&self, filters: ReportFilters) -> AppResult<Vec<BranchReportRow>> {
        let data = self.load().await?;
        let branch_names = self.branch_names().await?;
        Ok(branch_rows(&data, &filters, &branch_names, Utc::now().date_naive()))
    }

    pub async fn dashboard(&self, query: DashboardQuery) -> AppResult<DashboardSummary> {
        let data = self.load().await?;
        Ok(dashboard(&data, &query))
    }

    async fn load(&self) -> AppResult<ReportData> {
        let vehicles = self.vehicles.list_all().await?;
        let mut expenses: HashMap<String, Vec<VehicleExpense>> = HashMap::new();
        for expense in self.expenses.list_all().await? {
            expenses.entry(expense.vehicle_id.clone()).or_default().push(expense);
        }
        Ok(ReportData { vehicles, expenses })
    }

    async fn branch_names(&self) -> AppResult<HashMap<i64, String>> {
        Ok(self
            .branches
            .list()
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect())
    }
}

/// Vehículos (ordenados por matrícula) y sus gastos
pub struct ReportData {
    pub vehicles: Vec<Vehicle>,
    pub expenses: HashMap<String, Vec<VehicleExpense>>,
}

impl ReportData {
    fn expenses_of(&self, plate: &str) -> &[VehicleExpense] {
        self.expenses.get(plate).map(Vec::as_slice).unwrap_or_default()
    }

    fn purchase_total(&self, plate: &str) -> f64 {
        let amounts: Vec<ExpenseAmount> =
            self.expenses_of(plate).iter().map(VehicleExpense::as_amount).collect();
        purchase_total(&amounts)
    }

    /// Gastos sin compra dentro de la ventana de fechas
    fn other_total(&self, plate: &str, filters: &ReportFilters) -> f64 {
        self.expenses_of(plate)
            .iter()
            .filter(|e| !e.category.is_purchase() && filters.in_window(Some(e.date)))
            .map(|e| e.amount)
            .sum()
    }

    fn profit(&self, vehicle: &Vehicle, filters: &ReportFilters) -> Option<f64> {
        vehicle.sale_price.map(|price| {
            price
                - self.purchase_total(&vehicle.license_plate)
                - self.other_total(&vehicle.license_plate, filters)
        })
    }
}

/// Sucursal, estado y matrícula; sin ventana de fechas
fn matches_base(vehicle: &Vehicle, filters: &ReportFilters) -> bool {
    filters.branch_id.map_or(true, |id| vehicle.branch_id == id)
        && filters.status.map_or(true, |status| vehicle.status == status)
        && filters
            .vehicle_id
            .as_deref()
            .map_or(true, |plate| vehicle.license_plate == plate)
}

fn is_sold_in_window(vehicle: &Vehicle, filters: &ReportFilters) -> bool {
    vehicle.status == VehicleStatus::Sold && filters.in_window(vehicle.sold_at)
}

fn average(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn compute_kpis(data: &ReportData, filters: ReportFilters, today: NaiveDate) -> KpiReport {
    let base: Vec<&Vehicle> = data
        .vehicles
        .iter()
        .filter(|v| matches_base(v, &filters))
        .collect();
    let sold: Vec<&Vehicle> = base
        .iter()
        .copied()
        .filter(|v| is_sold_in_window(v, &filters))
        .collect();
    let in_stock: Vec<&Vehicle> = base.iter().copied().filter(|v| v.status.is_in_stock()).collect();

    let vehicles_published = match filters.status {
        Some(status) if status != VehicleStatus::Published => 0,
        _ => base.iter().filter(|v| v.status == VehicleStatus::Published).count() as i64,
    };

    let total_income: f64 = sold.iter().filter_map(|v| v.sale_price).sum();
    let total_purchase: f64 = sold.iter().map(|v| data.purchase_total(&v.license_plate)).sum();
    let total_expenses: f64 = base
        .iter()
        .map(|v| data.other_total(&v.license_plate, &filters))
        .sum();
    let total_profit = total_income - total_purchase - total_expenses;

    let vehicles_sold = sold.len() as i64;
    let avg_profit_per_sold = if vehicles_sold > 0 {
        Some(total_profit / vehicles_sold as f64)
    } else {
        None
    };

    let avg_margin_pct = average(sold.iter().filter_map(|v| {
        let price = v.sale_price.filter(|p| *p > 0.0)?;
        data.profit(v, &filters).map(|profit| profit / price)
    }));
    let avg_days_to_sell = average(
        sold.iter()
            .filter_map(|v| v.sold_at.map(|sold_at| days_between(v.purchase_date, sold_at) as f64)),
    );
    let avg_days_in_stock = average(
        in_stock
            .iter()
            .map(|v| days_between(v.purchase_date, today) as f64),
    );

    KpiReport {
        vehicles_total: base.len() as i64,
        vehicles_sold,
        vehicles_published,
        vehicles_in_stock: in_stock.len() as i64,
        total_income,
        total_purchase,
        total_expenses,
        total_profit,
        avg_profit_per_sold,
        avg_margin_pct,
        avg_days_to_sell,
        avg_days_in_stock,
        filters,
    }
}

/// "Marca Modelo Versión (MATRÍCULA)"
pub fn report_title(vehicle: &Vehicle) -> String {
    let title = vehicle.title();
    let plate = &vehicle.license_plate;
    if title.is_empty() {
        plate.clone()
    } else if title.contains(plate.as_str()) {
        title
    } else {
        format!("{} ({})", title, plate)
    }
}

pub fn vehicle_rows(
    data: &ReportData,
    filters: &ReportFilters,
    branch_names: &HashMap<i64, String>,
    today: NaiveDate,
) -> Vec<VehicleReportRow> {
    data.vehicles
        .iter()
        .filter(|v| matches_base(v, filters) && filters.in_window(v.sold_at))
        .map(|v| {
            let purchase_price = data.purchase_total(&v.license_plate);
            let total_expenses = data.other_total(&v.license_plate, filters);
            let profit = v.sale_price.map(|price| price - purchase_price - total_expenses);
            let margin_pct = match (profit, v.sale_price) {
                (Some(profit), Some(price)) if price > 0.0 => Some(profit / price),
                _ => None,
            };
            VehicleReportRow {
                vehicle_id: v.license_plate.clone(),
                title: report_title(v),
                branch_id: v.branch_id,
                branch: branch_names.get(&v.branch_id).cloned(),
                status: v.status,
                purchase_price,
                total_expenses,
                sale_price: v.sale_price,
                sold_at: v.sold_at,
                profit,
                margin_pct,
                days_in_stock: days_between(v.purchase_date, v.sold_at.unwrap_or(today)),
            }
        })
        .collect()
}

#[derive(Default)]
struct BranchAccumulator {
    sold: i64,
    income: f64,
    profit: f64,
    in_stock_days: Vec<f64>,
}

pub fn branch_rows(
    data: &ReportData,
    filters: &ReportFilters,
    branch_names: &HashMap<i64, String>,
    today: NaiveDate,
) -> Vec<BranchReportRow> {
    let mut groups: BTreeMap<i64, BranchAccumulator> = BTreeMap::new();

    for vehicle in data.vehicles.iter().filter(|v| matches_base(v, filters)) {
        if is_sold_in_window(vehicle, filters) {
            let group = groups.entry(vehicle.branch_id).or_default();
            let income = vehicle.sale_price.unwrap_or(0.0);
            group.sold += 1;
            group.income += income;
            group.profit += income
                - data.purchase_total(&vehicle.license_plate)
                - data.other_total(&vehicle.license_plate, filters);
        } else if vehicle.status.is_in_stock() {
            groups
                .entry(vehicle.branch_id)
                .or_default()
                .in_stock_days
                .push(days_between(vehicle.purchase_date, today) as f64);
        }
    }

    groups
        .into_iter()
        .map(|(branch_id, group)| BranchReportRow {
            branch_id,
            branch_name: branch_names.get(&branch_id).cloned().unwrap_or_default(),
            sold: group.sold,
            income: group.income,
            profit: group.profit,
            vehicles_in_stock: group.in_stock_days.len() as i64,
            avg_days_in_stock: average(group.in_stock_days),
        })
        .collect()
}

/// Ingresos de ventas y gastos dentro de la ventana, por sucursal opcional
pub fn dashboard(data: &ReportData, query: &DashboardQuery) -> DashboardSummary {
    let window = ReportFilters {
        from: query.from_date,
        to: query.to_date,
        ..Default::default()
    };
    let vehicles: Vec<&Vehicle> = data
        .vehicles
        .iter()
        .filter(|v| query.branch_id.map_or(true, |id| v.branch_id == id))
        .collect();

    let income: f64 = vehicles
        .iter()
        .filter(|v| v.status == VehicleStatus::Sold)
        .filter(|v| window.in_window(v.sale_date.or(v.sold_at)))
        .filter_map(|v| v.sale_price)
        .sum();
    let expenses: f64 = vehicles
        .iter()
        .flat_map(|v| data.expenses_of(&v.license_plate))
        .filter(|e| window.in_window(Some(e.date)))
        .map(|e| e.amount)
        .sum();

    DashboardSummary {
        vehicles: vehicles.len() as i64,
        income,
        expenses,
        margin: income - expenses,
    }
}
