use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::BranchTransfer;
use crate::utils::errors::AppError;

pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list_for_vehicle(&self, plate: &str) -> Result<Vec<BranchTransfer>, AppError> {
        let transfers = sqlx::query_as::<_, BranchTransfer>(
            "SELECT * FROM branch_transfer WHERE vehicle_id = ?1 ORDER BY transfer_date DESC, id DESC",
        )
        .bind(plate)
        .fetch_all(&self.pool)
        .await?;
        Ok(transfers)
    }

    pub async fn list_for_vehicles(&self, plates: &[String]) -> Result<Vec<BranchTransfer>, AppError> {
        if plates.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM branch_transfer WHERE vehicle_id IN (");
        let mut separated = builder.separated(", ");
        for plate in plates {
            separated.push_bind(plate.clone());
        }
        separated.push_unseparated(") ORDER BY id");
        let transfers = builder
            .build_query_as::<BranchTransfer>()
            .fetch_all(&self.pool)
            .await?;
        Ok(transfers)
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        plate: &str,
        from_branch_id: Option<i64>,
        to_branch_id: i64,
        transfer_date: NaiveDate,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BranchTransfer, AppError> {
        let transfer = sqlx::query_as::<_, BranchTransfer>(
            r#"
            INSERT INTO branch_transfer (vehicle_id, from_branch_id, to_branch_id, transfer_date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(plate)
        .bind(from_branch_id)
        .bind(to_branch_id)
        .bind(transfer_date)
        .bind(notes)
        .bind(now)
        .fetch_one(conn)
        .await?;
        Ok(transfer)
    }

    pub async fn insert_copy(conn: &mut SqliteConnection, transfer: &BranchTransfer) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO branch_transfer (vehicle_id, from_branch_id, to_branch_id, transfer_date, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&transfer.vehicle_id)
        .bind(transfer.from_branch_id)
        .bind(transfer.to_branch_id)
        .bind(transfer.transfer_date)
        .bind(&transfer.notes)
        .bind(transfer.created_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}
