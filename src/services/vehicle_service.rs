//! Servicio de vehículos
//!
//! Alta, lectura, edición y borrado de vehículos, más las operaciones que
//! mueven su ciclo de vida: cambio de estado, traslado de sucursal y cierre
//! de venta. Cada operación de varias filas va en una sola transacción junto
//! con sus eventos de historial.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};
use validator::Validate;

use crate::domain::status::validate_transition;
use crate::domain::{normalize_plate, VehicleKpis, VehicleStatus};
use crate::dto::{
    SaleRequest, SaleSummary, StatusChangeRequest, StatusResponse, VehicleListQuery,
    VehicleResponse,
};
use crate::models::event::DEFAULT_ACTOR;
use crate::models::{
    CreateVehicleRequest, MoveBranchRequest, NewVehicleEvent, UpdateVehicleRequest, Vehicle,
    VehicleEventType, VehicleExpense, VehicleStatusEvent,
};
use crate::repositories::{
    BranchRepository, EventRepository, ExpenseRepository, FileRepository, TransferRepository,
    VehicleRepository,
};
use crate::services::file_service::{remove_stored_files, vehicle_dir};
use crate::utils::errors::{bad_request_error, not_found_error, unprocessable_error, AppError, AppResult};
use crate::utils::validation::non_empty;

pub struct VehicleService {
    pool: SqlitePool,
    vehicles: VehicleRepository,
    expenses: ExpenseRepository,
    branches: BranchRepository,
    events: EventRepository,
}

impl VehicleService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vehicles: VehicleRepository::new(pool.clone()),
            expenses: ExpenseRepository::new(pool.clone()),
            branches: BranchRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            pool,
        }
    }

    /// Buscar un vehículo por matrícula o, si no existe, por id numérico
    pub async fn resolve(&self, identifier: &str) -> AppResult<Vehicle> {
        if let Some(plate) = normalize_plate(identifier) {
            if let Some(vehicle) = self.vehicles.find_by_plate(&plate).await? {
                return Ok(vehicle);
            }
        }
        if let Ok(legacy_id) = identifier.trim().parse::<i64>() {
            if let Some(vehicle) = self.vehicles.find_by_legacy_id(legacy_id).await? {
                return Ok(vehicle);
            }
        }
        Err(not_found_error("Vehiculo"))
    }

    /// Vehículo con sus campos financieros
    pub async fn respond(&self, vehicle: Vehicle) -> AppResult<VehicleResponse> {
        let expenses = self.expenses.list_for_vehicle(&vehicle.license_plate).await?;
        Ok(VehicleResponse::new(vehicle, &expenses))
    }

    pub async fn create(&self, request: CreateVehicleRequest) -> AppResult<VehicleResponse> {
        request.validate()?;

        let plate = normalize_plate(&request.license_plate)
            .ok_or_else(|| unprocessable_error("La matricula es requerida"))?;
        if self.vehicles.plate_exists(&plate).await? {
            return Err(AppError::Conflict("La matricula ya existe".to_string()));
        }
        self.ensure_branch(request.branch_id).await?;

        let now = Utc::now();
        let vehicle = Vehicle {
            id: 0,
            license_plate: plate.clone(),
            vin: request.vin.trim().to_string(),
            brand: request.brand.trim().to_string(),
            model: request.model.trim().to_string(),
            version: non_empty(request.version),
            year: request.year,
            km: request.km,
            color: non_empty(request.color),
            branch_id: request.branch_id,
            status: request.status.unwrap_or_default(),
            status_changed_at: now,
            status_reason: None,
            reserved_until: None,
            sold_at: None,
            purchase_date: request.purchase_date,
            purchase_price: request.purchase_price,
            sale_price: request.sale_price,
            published_price: request.published_price,
            target_margin_pct: request.target_margin_pct,
            sale_notes: None,
            sale_date: request.sale_date,
            notes: non_empty(request.notes),
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.pool.acquire().await?;
        VehicleRepository::insert(&mut conn, &vehicle).await?;
        drop(conn);

        info!("Vehiculo creado: {} ({})", plate, vehicle.title());
        let created = self.resolve(&plate).await?;
        self.respond(created).await
    }

    pub async fn list(&self, query: &VehicleListQuery) -> AppResult<Vec<VehicleResponse>> {
        let vehicles = self.vehicles.list(query).await?;
        let plates: Vec<String> = vehicles.iter().map(|v| v.license_plate.clone()).collect();
        let mut by_vehicle: HashMap<String, Vec<VehicleExpense>> = HashMap::new();
        for expense in self.expenses.list_for_vehicles(&plates).await? {
            by_vehicle.entry(expense.vehicle_id.clone()).or_default().push(expense);
        }

        Ok(vehicles
            .into_iter()
            .map(|vehicle| {
                let expenses = by_vehicle.remove(&vehicle.license_plate).unwrap_or_default();
                VehicleResponse::new(vehicle, &expenses)
            })
            .collect())
    }

    pub async fn get(&self, identifier: &str) -> AppResult<VehicleResponse> {
        let vehicle = self.resolve(identifier).await?;
        self.respond(vehicle).await
    }

    /// Actualización parcial. El estado se ignora: tiene su propio endpoint.
    pub async fn update(&self, identifier: &str, request: UpdateVehicleRequest) -> AppResult<VehicleResponse> {
        request.validate()?;
        let mut vehicle = self.resolve(identifier).await?;

        if let Some(raw) = &request.license_plate {
            if normalize_plate(raw).as_deref() != Some(vehicle.license_plate.as_str()) {
                return Err(unprocessable_error("La matricula no se puede modificar"));
            }
        }
        if request.status.is_some_and(|status| status != vehicle.status) {
            warn!(
                "Cambio de estado ignorado en PATCH de {}: usar el endpoint de estado",
                vehicle.license_plate
            );
        }
        if let Some(branch_id) = request.branch_id {
            if branch_id != vehicle.branch_id {
                self.ensure_branch(branch_id).await?;
            }
        }

        let fields = request.changed_fields();
        let UpdateVehicleRequest {
            vin,
            brand,
            model,
            version,
            year,
            km,
            color,
            branch_id,
            purchase_price,
            purchase_date,
            sale_price,
            sale_date,
            published_price,
            target_margin_pct,
            sale_notes,
            notes,
            ..
        } = request;

        if let Some(vin) = vin {
            vehicle.vin = vin.trim().to_string();
        }
        if let Some(brand) = brand {
            vehicle.brand = brand.trim().to_string();
        }
        if let Some(model) = model {
            vehicle.model = model.trim().to_string();
        }
        if version.is_some() {
            vehicle.version = non_empty(version);
        }
        if let Some(year) = year {
            vehicle.year = year;
        }
        if let Some(km) = km {
            vehicle.km = km;
        }
        if color.is_some() {
            vehicle.color = non_empty(color);
        }
        if let Some(branch_id) = branch_id {
            vehicle.branch_id = branch_id;
        }
        if purchase_price.is_some() {
            vehicle.purchase_price = purchase_price;
        }
        if let Some(purchase_date) = purchase_date {
            vehicle.purchase_date = purchase_date;
        }
        if sale_price.is_some() {
            vehicle.sale_price = sale_price;
        }
        if sale_date.is_some() {
            vehicle.sale_date = sale_date;
        }
        if published_price.is_some() {
            vehicle.published_price = published_price;
        }
        if target_margin_pct.is_some() {
            vehicle.target_margin_pct = target_margin_pct;
        }
        if sale_notes.is_some() {
            vehicle.sale_notes = non_empty(sale_notes);
        }
        if notes.is_some() {
            vehicle.notes = non_empty(notes);
        }

        let now = Utc::now();
        vehicle.updated_at = now;

        let mut tx = self.pool.begin().await?;
        VehicleRepository::save(&mut tx, &vehicle).await?;
        if !fields.is_empty() {
            let event = NewVehicleEvent::new(VehicleEventType::VehicleUpdated, json!({ "fields": fields }));
            EventRepository::insert_event(&mut tx, &vehicle.license_plate, &event, now).await?;
        }
        tx.commit().await?;

        info!("Vehiculo actualizado: {} {:?}", vehicle.license_plate, fields);
        self.respond(vehicle).await
    }

    /// Borra el vehículo, todo lo que cuelga de él y su carpeta de archivos
    pub async fn delete(&self, identifier: &str, storage_root: &Path) -> AppResult<StatusResponse> {
        let vehicle = self.resolve(identifier).await?;
        let plate = vehicle.license_plate;

        let mut tx = self.pool.begin().await?;
        let stored_names = FileRepository::stored_names(&mut tx, &plate).await?;
        VehicleRepository::delete_related(&mut tx, &plate).await?;
        VehicleRepository::delete(&mut tx, &plate).await?;
        tx.commit().await?;

        remove_stored_files(&vehicle_dir(storage_root, &plate), &stored_names).await;

        info!("Vehiculo eliminado: {}", plate);
        Ok(StatusResponse::ok())
    }

    /// Cambio de estado validado con la tabla de transiciones
    pub async fn change_status(&self, identifier: &str, request: StatusChangeRequest) -> AppResult<VehicleResponse> {
        let mut vehicle = self.resolve(identifier).await?;
        let StatusChangeRequest { change, actor } = request;

        let from = vehicle.status;
        let to = change.to_status;
        validate_transition(from, to).map_err(|e| bad_request_error(&e.to_string()))?;

        let now = Utc::now();
        let note = non_empty(change.note);
        let actor = non_empty(actor).unwrap_or_else(|| DEFAULT_ACTOR.to_string());

        vehicle.status = to;
        vehicle.status_changed_at = now;
        vehicle.status_reason = note.clone();
        vehicle.reserved_until = match to {
            VehicleStatus::Reserved => change.reserved_until.or(vehicle.reserved_until),
            _ => None,
        };
        vehicle.sold_at = match to {
            VehicleStatus::Sold => change.sold_at.or(vehicle.sale_date),
            _ => None,
        };
        vehicle.updated_at = now;

        let mut tx = self.pool.begin().await?;
        VehicleRepository::save(&mut tx, &vehicle).await?;
        EventRepository::insert_status_event(
            &mut tx,
            &vehicle.license_plate,
            from,
            to,
            note.as_deref(),
            &actor,
            now,
        )
        .await?;
        let event = NewVehicleEvent::new(
            VehicleEventType::StatusChange,
            json!({ "from": from, "to": to, "note": note }),
        )
        .with_actor(Some(actor));
        EventRepository::insert_event(&mut tx, &vehicle.license_plate, &event, now).await?;
        tx.commit().await?;

        info!("Estado de {} cambiado: {} -> {}", vehicle.license_plate, from, to);
        self.respond(vehicle).await
    }

    pub async fn status_events(&self, identifier: &str, limit: i64) -> AppResult<Vec<VehicleStatusEvent>> {
        let vehicle = self.resolve(identifier).await?;
        self.events.list_status_events(&vehicle.license_plate, limit).await
    }

    /// Traslado a otra sucursal con su registro en el historial
    pub async fn move_branch(&self, identifier: &str, request: MoveBranchRequest) -> AppResult<VehicleResponse> {
        request.validate()?;
        let mut vehicle = self.resolve(identifier).await?;

        let target = self
            .branches
            .find_by_id(request.to_branch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sucursal no encontrada".to_string()))?;
        if target.id == vehicle.branch_id {
            return Err(bad_request_error("El vehiculo ya esta en esa sucursal"));
        }
        let from_branch = self.branches.find_by_id(vehicle.branch_id).await?;

        let now = Utc::now();
        let note = non_empty(request.note);
        let from_branch_id = vehicle.branch_id;
        vehicle.branch_id = target.id;
        vehicle.updated_at = now;

        let mut tx = self.pool.begin().await?;
        TransferRepository::insert(
            &mut tx,
            &vehicle.license_plate,
            Some(from_branch_id),
            target.id,
            request.transfer_date.unwrap_or_else(|| now.date_naive()),
            note.as_deref(),
            now,
        )
        .await?;
        VehicleRepository::save(&mut tx, &vehicle).await?;
        let event = NewVehicleEvent::new(
            VehicleEventType::BranchMoved,
            json!({
                "from_branch_id": from_branch_id,
                "from_branch_name": from_branch.map(|b| b.name),
                "to_branch_id": target.id,
                "to_branch_name": target.name,
                "note": note,
            }),
        );
        EventRepository::insert_event(&mut tx, &vehicle.license_plate, &event, now).await?;
        tx.commit().await?;

        info!(
            "Vehiculo {} trasladado de sucursal {} a {}",
            vehicle.license_plate, from_branch_id, target.id
        );
        self.respond(vehicle).await
    }

    /// Cierre de venta: fija precio y fecha y pasa el vehículo a vendido
    pub async fn close_sale(&self, identifier: &str, request: SaleRequest) -> AppResult<VehicleResponse> {
        request.validate()?;
        let mut vehicle = self.resolve(identifier).await?;

        let from = vehicle.status;
        let status_changes = from != VehicleStatus::Sold;
        if status_changes {
            validate_transition(from, VehicleStatus::Sold).map_err(|e| bad_request_error(&e.to_string()))?;
        }

        let now = Utc::now();
        let sold_at = request.sold_at.unwrap_or_else(|| now.date_naive());
        vehicle.sale_price = Some(request.sale_price);
        vehicle.sold_at = Some(sold_at);
        vehicle.sale_date = Some(sold_at);
        vehicle.sale_notes = non_empty(request.sale_notes);
        vehicle.reserved_until = None;
        if status_changes {
            vehicle.status = VehicleStatus::Sold;
            vehicle.status_changed_at = now;
        }
        vehicle.updated_at = now;

        let mut tx = self.pool.begin().await?;
        VehicleRepository::save(&mut tx, &vehicle).await?;
        if status_changes {
            EventRepository::insert_status_event(
                &mut tx,
                &vehicle.license_plate,
                from,
                VehicleStatus::Sold,
                Some("Venta cerrada"),
                DEFAULT_ACTOR,
                now,
            )
            .await?;
        }
        let event = NewVehicleEvent::new(
            VehicleEventType::SaleClosed,
            json!({
                "sale_price": vehicle.sale_price,
                "sold_at": vehicle.sold_at,
                "sale_notes": vehicle.sale_notes,
            }),
        );
        EventRepository::insert_event(&mut tx, &vehicle.license_plate, &event, now).await?;
        tx.commit().await?;

        info!("Venta cerrada: {} por {:.2}", vehicle.license_plate, request.sale_price);
        self.respond(vehicle).await
    }

    pub async fn get_sale(&self, identifier: &str) -> AppResult<SaleSummary> {
        let vehicle = self.resolve(identifier).await?;
        if vehicle.status != VehicleStatus::Sold {
            return Err(AppError::NotFound("Venta no encontrada".to_string()));
        }
        let response = self.respond(vehicle).await?;
        SaleSummary::from_vehicle(&response).ok_or_else(|| AppError::NotFound("Venta no encontrada".to_string()))
    }

    pub async fn kpis(&self, identifier: &str) -> AppResult<VehicleKpis> {
        let vehicle = self.resolve(identifier).await?;
        let expenses = self.expenses.list_for_vehicle(&vehicle.license_plate).await?;
        let amounts: Vec<_> = expenses.iter().map(VehicleExpense::as_amount).collect();
        Ok(VehicleKpis::compute(
            &vehicle.license_plate,
            &amounts,
            vehicle.sale_price,
            Some(vehicle.purchase_date),
            vehicle.sold_at,
            Utc::now().date_naive(),
        ))
    }

    async fn ensure_branch(&self, branch_id: i64) -> AppResult<()> {
        match self.branches.find_by_id(branch_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Sucursal no encontrada".to_string())),
        }
    }
}
