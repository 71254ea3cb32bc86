//! Gastos de vehículo
//!
//! Cada alta, cambio o baja deja su evento en el timeline dentro de la
//! misma transacción.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::dto::StatusResponse;
use crate::models::{
    CreateExpenseRequest, NewVehicleEvent, UpdateExpenseRequest, VehicleEventType, VehicleExpense,
};
use crate::repositories::{EventRepository, ExpenseRepository, FileRepository};
use crate::services::vehicle_service::VehicleService;
use crate::utils::errors::{not_found_error, unprocessable_error, AppResult};
use crate::utils::validation::non_empty;

pub struct ExpenseService {
    pool: SqlitePool,
    vehicles: VehicleService,
    expenses: ExpenseRepository,
    files: FileRepository,
}

impl ExpenseService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleService::new(pool.clone()),
            expenses: ExpenseRepository::new(pool.clone()),
            files: FileRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn list(&self, identifier: &str) -> AppResult<Vec<VehicleExpense>> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        self.expenses.list_for_vehicle(&vehicle.license_plate).await
    }

    pub async fn create(&self, identifier: &str, mut request: CreateExpenseRequest) -> AppResult<VehicleExpense> {
        request.validate()?;
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;

        check_amount(request.amount)?;
        if let Some(file_id) = request.linked_vehicle_file_id {
            self.ensure_file(&plate, file_id).await?;
        }
        request.currency = request.currency.trim().to_uppercase();
        request.vendor = non_empty(request.vendor);
        request.invoice_ref = non_empty(request.invoice_ref);
        request.payment_method = non_empty(request.payment_method);
        request.notes = non_empty(request.notes);

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let expense = ExpenseRepository::insert(&mut tx, &plate, &request, now).await?;
        let event = NewVehicleEvent::new(VehicleEventType::ExpenseCreated, expense.event_payload());
        EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
        tx.commit().await?;

        info!("Gasto {} creado para {}: {:.2} {}", expense.id, plate, expense.amount, expense.currency);
        Ok(expense)
    }

    pub async fn update(
        &self,
        identifier: &str,
        expense_id: i64,
        request: UpdateExpenseRequest,
    ) -> AppResult<VehicleExpense> {
        request.validate()?;
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;
        let mut expense = self.find(&plate, expense_id).await?;

        if let Some(amount) = request.amount {
            check_amount(amount)?;
            expense.amount = amount;
        }
        if let Some(file_id) = request.linked_vehicle_file_id {
            self.ensure_file(&plate, file_id).await?;
            expense.linked_vehicle_file_id = Some(file_id);
        }
        if let Some(currency) = request.currency {
            expense.currency = currency.trim().to_uppercase();
        }
        if let Some(date) = request.date {
            expense.date = date;
        }
        if let Some(category) = request.category {
            expense.category = category;
        }
        if request.vendor.is_some() {
            expense.vendor = non_empty(request.vendor);
        }
        if request.invoice_ref.is_some() {
            expense.invoice_ref = non_empty(request.invoice_ref);
        }
        if request.payment_method.is_some() {
            expense.payment_method = non_empty(request.payment_method);
        }
        if request.notes.is_some() {
            expense.notes = non_empty(request.notes);
        }

        let now = Utc::now();
        expense.updated_at = now;

        let mut tx = self.pool.begin().await?;
        ExpenseRepository::save(&mut tx, &expense).await?;
        let event = NewVehicleEvent::new(VehicleEventType::ExpenseUpdated, expense.event_payload());
        EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
        tx.commit().await?;

        info!("Gasto {} actualizado ({})", expense.id, plate);
        Ok(expense)
    }

    pub async fn delete(&self, identifier: &str, expense_id: i64) -> AppResult<StatusResponse> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        let plate = vehicle.license_plate;
        let expense = self.find(&plate, expense_id).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        ExpenseRepository::delete(&mut tx, expense.id).await?;
        let event = NewVehicleEvent::new(VehicleEventType::ExpenseDeleted, expense.event_payload());
        EventRepository::insert_event(&mut tx, &plate, &event, now).await?;
        tx.commit().await?;

        info!("Gasto {} eliminado ({})", expense.id, plate);
        Ok(StatusResponse::ok())
    }

    /// Gasto que además pertenece al vehículo indicado
    async fn find(&self, plate: &str, expense_id: i64) -> AppResult<VehicleExpense> {
        match self.expenses.find(expense_id).await? {
            Some(expense) if expense.vehicle_id == plate => Ok(expense),
            _ => Err(not_found_error("Gasto")),
        }
    }

    async fn ensure_file(&self, plate: &str, file_id: i64) -> AppResult<()> {
        match self.files.find_for_vehicle(plate, file_id).await? {
            Some(_) => Ok(()),
            None => Err(not_found_error("Archivo")),
        }
    }
}

fn check_amount(amount: f64) -> AppResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(unprocessable_error("El importe debe ser mayor que 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_amount() {
        assert!(check_amount(0.01).is_ok());
        assert!(check_amount(0.0).is_err());
        assert!(check_amount(-5.0).is_err());
        assert!(check_amount(f64::NAN).is_err());
    }
}
