use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::{CreateExpenseRequest, VehicleExpense};
use crate::utils::errors::AppError;

pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Gastos de un vehículo, más recientes primero
    pub async fn list_for_vehicle(&self, plate: &str) -> Result<Vec<VehicleExpense>, AppError> {
        let expenses = sqlx::query_as::<_, VehicleExpense>(
            "SELECT * FROM vehicle_expense WHERE vehicle_id = ?1 ORDER BY date DESC, created_at DESC, id DESC",
        )
        .bind(plate)
        .fetch_all(&self.pool)
        .await?;
        Ok(expenses)
    }

    pub async fn list_for_vehicles(&self, plates: &[String]) -> Result<Vec<VehicleExpense>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM vehicle_expense WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let expenses = builder
            .build_query_as::<VehicleExpense>()
            .fetch_all(&self.pool)
            .await?;
        Ok(expenses)
    }

    pub async fn list_all(&self) -> Result<Vec<VehicleExpense>, AppError> {
        let expenses = sqlx::query_as::<_, VehicleExpense>("SELECT * FROM vehicle_expense ORDER BY date, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(expenses)
    }

    pub async fn find(&self, id: i64) -> Result<Option<VehicleExpense>, AppError> {
        let expense = sqlx::query_as::<_, VehicleExpense>("SELECT * FROM vehicle_expense WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        plate: &str,
        request: &CreateExpenseRequest,
        now: DateTime<Utc>,
    ) -> Result<VehicleExpense, AppError> {
        let expense = sqlx::query_as::<_, VehicleExpense>(
            r#"
            INSERT INTO vehicle_expense (
                vehicle_id, amount, currency, date, category, vendor, invoice_ref,
                payment_method, notes, linked_vehicle_file_id, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            RETURNING *
            "#,
        )
        .bind(plate)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.date)
        .bind(request.category)
        .bind(&request.vendor)
        .bind(&request.invoice_ref)
        .bind(&request.payment_method)
        .bind(&request.notes)
        .bind(request.linked_vehicle_file_id)
        .bind(now)
        .fetch_one(conn)
        .await?;
        Ok(expense)
    }

    /// Copia fiel de un gasto (importación de paquetes)
    pub async fn insert_copy(conn: &mut SqliteConnection, expense: &VehicleExpense) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO vehicle_expense (
                vehicle_id, amount, currency, date, category, vendor, invoice_ref,
                payment_method, notes, linked_vehicle_file_id, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&expense.vehicle_id)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(expense.date)
        .bind(expense.category)
        .bind(&expense.vendor)
        .bind(&expense.invoice_ref)
        .bind(&expense.payment_method)
        .bind(&expense.notes)
        .bind(expense.linked_vehicle_file_id)
        .bind(expense.created_at)
        .bind(expense.updated_at)
        .execute(conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(conn: &mut SqliteConnection, expense: &VehicleExpense) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE vehicle_expense
            SET amount = ?2, currency = ?3, date = ?4, category = ?5, vendor = ?6,
                invoice_ref = ?7, payment_method = ?8, notes = ?9,
                linked_vehicle_file_id = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(expense.id)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(expense.date)
        .bind(expense.category)
        .bind(&expense.vendor)
        .bind(&expense.invoice_ref)
        .bind(&expense.payment_method)
        .bind(&expense.notes)
        .bind(expense.linked_vehicle_file_id)
        .bind(expense.updated_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM vehicle_expense WHERE id = ?1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
