use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::dto::StatusResponse;
use crate::models::{CreateLinkRequest, VehicleLink};
use crate::repositories::LinkRepository;
use crate::services::vehicle_service::VehicleService;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::non_empty;

pub struct LinkService {
    vehicles: VehicleService,
    links: LinkRepository,
}

impl LinkService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleService::new(pool.clone()),
            links: LinkRepository::new(pool),
        }
    }

    pub async fn list(&self, identifier: &str) -> AppResult<Vec<VehicleLink>> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        self.links.list_for_vehicle(&vehicle.license_plate).await
    }

    pub async fn create(&self, identifier: &str, request: CreateLinkRequest) -> AppResult<VehicleLink> {
        request.validate()?;
        let vehicle = self.vehicles.resolve(identifier).await?;
        let title = non_empty(request.title);
        let link = self
            .links
            .create(&vehicle.license_plate, title.as_deref(), request.url.trim(), Utc::now())
            .await?;
        info!("Enlace {} añadido a {}", link.id, vehicle.license_plate);
        Ok(link)
    }

    pub async fn delete(&self, identifier: &str, link_id: i64) -> AppResult<StatusResponse> {
        let vehicle = self.vehicles.resolve(identifier).await?;
        match self.links.find(link_id).await? {
            Some(link) if link.vehicle_id == vehicle.license_plate => {
                self.links.delete(link.id).await?;
                Ok(StatusResponse::ok())
            }
            _ => Err(AppError::NotFound("Enlace no encontrado".to_string())),
        }
    }
}
