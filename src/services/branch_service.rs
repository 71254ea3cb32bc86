use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::dto::StatusResponse;
use crate::models::{Branch, BranchRequest};
use crate::repositories::{BranchRepository, VehicleRepository};
use crate::utils::errors::{conflict_error, AppError, AppResult};

pub struct BranchService {
    branches: BranchRepository,
    vehicles: VehicleRepository,
}

impl BranchService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            branches: BranchRepository::new(pool.clone()),
            vehicles: VehicleRepository::new(pool),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<Branch>> {
        self.branches.list().await
    }

    pub async fn create(&self, request: BranchRequest) -> AppResult<Branch> {
        request.validate()?;
        let name = request.name.trim();
        if self.branches.name_exists(name, None).await? {
            return Err(conflict_error("La sucursal ya existe"));
        }
        let branch = self.branches.create(name).await?;
        info!("Sucursal creada: {} ({})", branch.name, branch.id);
        Ok(branch)
    }

    pub async fn update(&self, id: i64, request: BranchRequest) -> AppResult<Branch> {
        request.validate()?;
        self.find(id).await?;
        let name = request.name.trim();
        if self.branches.name_exists(name, Some(id)).await? {
            return Err(conflict_error("La sucursal ya existe"));
        }
        let branch = self
            .branches
            .rename(id, name)
            .await?
            .ok_or_else(|| AppError::NotFound("Sucursal no encontrada".to_string()))?;
        info!("Sucursal renombrada: {} -> {}", id, branch.name);
        Ok(branch)
    }

    /// No se borra una sucursal con vehículos asignados
    pub async fn delete(&self, id: i64) -> AppResult<StatusResponse> {
        self.find(id).await?;
        let in_use = self.vehicles.count_by_branch(id).await?;
        if in_use > 0 {
            return Err(conflict_error("La sucursal tiene vehiculos asociados"));
        }
        self.branches.delete(id).await?;
        info!("Sucursal eliminada: {}", id);
        Ok(StatusResponse::ok())
    }

    async fn find(&self, id: i64) -> AppResult<Branch> {
        self.branches
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sucursal no encontrada".to_string()))
    }
}
