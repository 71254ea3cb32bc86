//! Campos financieros derivados
//!
//! Todo se recalcula en cada lectura a partir de los datos guardados; no hay
//! caché que invalidar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::expense::ExpenseCategory;

/// Importe y categoría: lo mínimo que hace falta para los cálculos
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpenseAmount {
    pub amount: f64,
    pub category: ExpenseCategory,
}

impl ExpenseAmount {
    pub fn new(category: ExpenseCategory, amount: f64) -> Self {
        Self { amount, category }
    }
}

/// Suma de gastos, opcionalmente sin la categoría PURCHASE
pub fn total_expenses(expenses: &[ExpenseAmount], exclude_purchase: bool) -> f64 {
    expenses
        .iter()
        .filter(|e| !(exclude_purchase && e.category.is_purchase()))
        .map(|e| e.amount)
        .sum()
}

/// Suma de gastos de compra (PURCHASE)
pub fn purchase_total(expenses: &[ExpenseAmount]) -> f64 {
    expenses
        .iter()
        .filter(|e| e.category.is_purchase())
        .map(|e| e.amount)
        .sum()
}

/// `None` si y solo si no hay precio de venta
pub fn profit(sale_price: Option<f64>, total: f64) -> Option<f64> {
    sale_price.map(|price| price - total)
}

pub fn margin_pct(profit: Option<f64>, sale_price: Option<f64>) -> Option<f64> {
    match (profit, sale_price) {
        (Some(profit), Some(price)) if price > 0.0 => Some(profit / price),
        _ => None,
    }
}

/// Días enteros desde la entrada hasta la venta (o hasta hoy)
pub fn days_in_stock(start: NaiveDate, sold_at: Option<NaiveDate>, today: NaiveDate) -> i64 {
    let end = sold_at.unwrap_or(today);
    (end - start).num_days()
}

/// Campos financieros del vehículo en las lecturas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct VehicleFinancials {
    pub total_expenses: f64,
    pub profit: Option<f64>,
    pub margin_pct: Option<f64>,
}

impl VehicleFinancials {
    /// Los gastos de compra no cuentan en `total_expenses`.
    pub fn compute(expenses: &[ExpenseAmount], sale_price: Option<f64>) -> Self {
        let total = total_expenses(expenses, true);
        let profit = profit(sale_price, total);
        Self {
            total_expenses: total,
            profit,
            margin_pct: margin_pct(profit, sale_price),
        }
    }
}

/// KPIs de un vehículo: aquí el coste total sí incluye la compra
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleKpis {
    pub vehicle_id: String,
    pub total_expenses: f64,
    pub total_cost: f64,
    pub sale_price: Option<f64>,
    pub gross_margin: Option<f64>,
    pub roi: Option<f64>,
    pub days_in_stock: Option<i64>,
}

impl VehicleKpis {
    pub fn compute(
        vehicle_id: &str,
        expenses: &[ExpenseAmount],
        sale_price: Option<f64>,
        stock_start: Option<NaiveDate>,
        sold_at: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let total_cost = total_expenses(expenses, false);
        let gross_margin = profit(sale_price, total_cost);
        let roi = match gross_margin {
            Some(margin) if total_cost > 0.0 => Some(margin / total_cost),
            _ => None,
        };
        Self {
            vehicle_id: vehicle_id.to_string(),
            total_expenses: total_cost,
            total_cost,
            sale_price,
            gross_margin,
            roi,
            days_in_stock: stock_start.map(|start| days_in_stock(start, sold_at, today)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_financials_exclude_purchase() {
        let expenses = vec![
            ExpenseAmount::new(ExpenseCategory::Purchase, 1000.0),
            ExpenseAmount::new(ExpenseCategory::Mechanical, 200.0),
        ];
        let financials = VehicleFinancials::compute(&expenses, Some(1500.0));
        assert_eq!(financials.total_expenses, 200.0);
        assert_eq!(financials.profit, Some(1300.0));
        let margin = financials.margin_pct.unwrap();
        assert!((margin - 0.8667).abs() < 1e-3);
    }

    #[test]
    fn test_purchase_total_counts_only_purchase() {
        let expenses = vec![
            ExpenseAmount::new(ExpenseCategory::Purchase, 6000.0),
            ExpenseAmount::new(ExpenseCategory::Mechanical, 200.0),
            ExpenseAmount::new(ExpenseCategory::Purchase, 150.0),
        ];
        assert_eq!(purchase_total(&expenses), 6150.0);
        assert_eq!(purchase_total(&[]), 0.0);
    }

    #[test]
    fn test_profit_is_none_without_sale_price() {
        let expenses = vec![ExpenseAmount::new(ExpenseCategory::Tires, 80.0)];
        let financials = VehicleFinancials::compute(&expenses, None);
        assert_eq!(financials.total_expenses, 80.0);
        assert_eq!(financials.profit, None);
        assert_eq!(financials.margin_pct, None);
    }

    #[test]
    fn test_margin_requires_positive_sale_price() {
        assert_eq!(margin_pct(Some(-50.0), Some(0.0)), None);
        assert_eq!(margin_pct(Some(50.0), Some(100.0)), Some(0.5));
        assert_eq!(margin_pct(None, Some(100.0)), None);
    }

    #[test]
    fn test_margin_matches_profit_over_price() {
        for (sale, costs) in [(1000.0, 900.0), (12500.0, 14000.0), (1.0, 0.0)] {
            let expenses = vec![ExpenseAmount::new(ExpenseCategory::Other, costs)];
            let f = VehicleFinancials::compute(&expenses, Some(sale));
            assert_eq!(f.margin_pct, Some(f.profit.unwrap() / sale));
        }
    }

    #[test]
    fn test_days_in_stock() {
        let start = date(2024, 1, 1);
        assert_eq!(days_in_stock(start, Some(date(2024, 1, 31)), date(2024, 6, 1)), 30);
        assert_eq!(days_in_stock(start, None, date(2024, 1, 11)), 10);
    }

    #[test]
    fn test_vehicle_kpis_roi() {
        let expenses = vec![
            ExpenseAmount::new(ExpenseCategory::Purchase, 6000.0),
            ExpenseAmount::new(ExpenseCategory::Other, 500.0),
        ];
        let kpis = VehicleKpis::compute(
            "ABC123",
            &expenses,
            Some(10000.0),
            Some(date(2024, 1, 1)),
            None,
            date(2024, 1, 21),
        );
        assert_eq!(kpis.total_cost, 6500.0);
        assert_eq!(kpis.gross_margin, Some(3500.0));
        assert!((kpis.roi.unwrap() - 3500.0 / 6500.0).abs() < 1e-9);
        assert_eq!(kpis.days_in_stock, Some(20));
    }

    #[test]
    fn test_vehicle_kpis_without_costs() {
        let kpis = VehicleKpis::compute("X1", &[], Some(100.0), None, None, date(2024, 1, 1));
        assert_eq!(kpis.roi, None);
        assert_eq!(kpis.days_in_stock, None);
    }
}
