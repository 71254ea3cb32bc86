//! Modelo de VehicleExpense
//!
//! Gastos asociados a un vehículo. La compra también se registra como un
//! gasto de categoría `PURCHASE`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::domain::expense::DEFAULT_CURRENCY;
use crate::domain::{ExpenseAmount, ExpenseCategory};

/// VehicleExpense principal - mapea exactamente a la tabla vehicle_expense
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct VehicleExpense {
    pub id: i64,
    pub vehicle_id: String,
    pub amount: f64,
    pub currency: String,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub vendor: Option<String>,
    pub invoice_ref: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub linked_vehicle_file_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VehicleExpense {
    pub fn as_amount(&self) -> ExpenseAmount {
        ExpenseAmount::new(self.category, self.amount)
    }

    /// Payload del evento de timeline
    pub fn event_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "amount": self.amount,
            "currency": self.currency,
            "category": self.category,
        })
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Request para crear un gasto
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExpenseRequest {
    pub amount: f64,

    #[serde(default = "default_currency")]
    #[validate(length(min = 3, max = 3))]
    pub currency: String,

    pub date: NaiveDate,

    pub category: ExpenseCategory,

    #[validate(length(max = 200))]
    pub vendor: Option<String>,

    #[validate(length(max = 100))]
    pub invoice_ref: Option<String>,

    #[validate(length(max = 50))]
    pub payment_method: Option<String>,

    pub notes: Option<String>,

    pub linked_vehicle_file_id: Option<i64>,
}

/// Request para actualizar un gasto existente (solo los campos presentes)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateExpenseRequest {
    pub amount: Option<f64>,

    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,

    pub date: Option<NaiveDate>,

    pub category: Option<ExpenseCategory>,

    #[validate(length(max = 200))]
    pub vendor: Option<String>,

    #[validate(length(max = 100))]
    pub invoice_ref: Option<String>,

    #[validate(length(max = 50))]
    pub payment_method: Option<String>,

    pub notes: Option<String>,

    pub linked_vehicle_file_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_defaults_to_eur() {
        let request: CreateExpenseRequest = serde_json::from_value(serde_json::json!({
            "amount": 120.5,
            "date": "2024-02-01",
            "category": "MECHANICAL"
        }))
        .unwrap();
        assert_eq!(request.currency, "EUR");
        assert_eq!(request.category, ExpenseCategory::Mechanical);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result: Result<CreateExpenseRequest, _> = serde_json::from_value(serde_json::json!({
            "amount": 10.0,
            "date": "2024-02-01",
            "category": "FUEL"
        }));
        assert!(result.is_err());
    }
}
