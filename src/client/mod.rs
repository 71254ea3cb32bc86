//! Pasarela HTTP tipada para la API de Sahocars
//!
//! Una función por endpoint. Cada llamada es un único intento: cualquier
//! respuesta no 2xx se devuelve como `ClientError::Status` con el cuerpo
//! como mensaje, sin reintentos.

pub mod errors;
pub mod vehicle;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{normalize_plate, StatusChange, VehicleKpis, VehicleStatus};
use crate::dto::{
    BackupCreateRequest, BackupCreated, BackupListItem, BackupRestoreRequest, BranchReportRow,
    DashboardSummary, GoogleStatusResponse, HealthResponse, KpiReport, ReportQuery,
    RestoreResult, SaleRequest, SaleSummary, TimelineEntry, VehicleReportRow, VersionResponse,
    WipeRequest, WipeResult,
};
use crate::models::{
    Branch, BranchRequest, CreateExpenseRequest, CreateLinkRequest, CreateVehicleRequest,
    FileCategory, MoveBranchRequest, UpdateExpenseRequest, UpdateVehicleRequest, VehicleEventType,
    VehicleExpense, VehicleFile, VehicleLink, VehicleStatusEvent, VehicleVisit, VisitRequest,
};
use crate::services::ExportResource;

pub use errors::{ClientError, ClientResult};
pub use vehicle::ApiVehicle;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Filtros de `GET /vehicles`
#[derive(Debug, Clone, Default, Serialize)]
pub struct VehicleFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VehicleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
}

/// Filtros de `GET /dashboard`
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
}

/// Fichero a subir
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub category: FileCategory,
    pub notes: Option<String>,
}

/// Cliente de la API REST
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reutilizar un `reqwest::Client` ya configurado
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn vehicle_url(&self, plate: &str, suffix: &str) -> String {
        self.url(&format!("/vehicles/{}{}", encode_plate(plate), suffix))
    }

    async fn send_text(&self, request: RequestBuilder) -> ClientResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("API error [{}]: {}", status.as_u16(), body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let body = self.send_text(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Para borrados: el cuerpo de éxito no interesa
    async fn send_empty(&self, request: RequestBuilder) -> ClientResult<()> {
        self.send_text(request).await.map(|_| ())
    }

    // --- Sistema ---

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        self.send_json(self.client.get(self.url("/health"))).await
    }

    pub async fn version(&self) -> ClientResult<VersionResponse> {
        self.send_json(self.client.get(self.url("/version"))).await
    }

    // --- Sucursales ---

    pub async fn list_branches(&self) -> ClientResult<Vec<Branch>> {
        self.send_json(self.client.get(self.url("/branches"))).await
    }

    pub async fn create_branch(&self, name: &str) -> ClientResult<Branch> {
        let request = BranchRequest { name: name.to_string() };
        self.send_json(self.client.post(self.url("/branches")).json(&request)).await
    }

    pub async fn update_branch(&self, branch_id: i64, name: &str) -> ClientResult<Branch> {
        let request = BranchRequest { name: name.to_string() };
        let url = self.url(&format!("/branches/{}", branch_id));
        self.send_json(self.client.patch(url).json(&request)).await
    }

    pub async fn delete_branch(&self, branch_id: i64) -> ClientResult<()> {
        let url = self.url(&format!("/branches/{}", branch_id));
        self.send_empty(self.client.delete(url)).await
    }

    // --- Vehículos ---

    pub async fn list_vehicles(&self, filter: &VehicleFilter) -> ClientResult<Vec<ApiVehicle>> {
        self.send_json(self.client.get(self.url("/vehicles")).query(filter)).await
    }

    pub async fn get_vehicle(&self, plate: &str) -> ClientResult<ApiVehicle> {
        self.send_json(self.client.get(self.vehicle_url(plate, ""))).await
    }

    pub async fn create_vehicle(&self, request: &CreateVehicleRequest) -> ClientResult<ApiVehicle> {
        let mut request = request.clone();
        request.license_plate = normalize_plate(&request.license_plate).unwrap_or_default();
        self.send_json(self.client.post(self.url("/vehicles")).json(&request)).await
    }

    pub async fn update_vehicle(
        &self,
        plate: &str,
        request: &UpdateVehicleRequest,
    ) -> ClientResult<ApiVehicle> {
        self.send_json(self.client.patch(self.vehicle_url(plate, "")).json(request))
            .await
    }

    pub async fn delete_vehicle(&self, plate: &str) -> ClientResult<()> {
        self.send_empty(self.client.delete(self.vehicle_url(plate, ""))).await
    }

    /// Cambio de estado. Con `current` conocido se valida la transición
    /// antes de enviar; las fechas obligatorias se comprueban siempre.
    pub async fn change_status(
        &self,
        plate: &str,
        change: &StatusChange,
        current: Option<VehicleStatus>,
    ) -> ClientResult<ApiVehicle> {
        let check = match current {
            Some(current) => change.validate_from(current),
            None => change.check_required_dates(),
        };
        check.map_err(|e| ClientError::Rejected(e.to_string()))?;

        self.send_json(self.client.post(self.vehicle_url(plate, "/status")).json(change))
            .await
    }

    pub async fn list_status_events(
        &self,
        plate: &str,
        limit: Option<i64>,
    ) -> ClientResult<Vec<VehicleStatusEvent>> {
        let mut request = self.client.get(self.vehicle_url(plate, "/status/events"));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        self.send_json(request).await
    }

    pub async fn move_branch(&self, plate: &str, request: &MoveBranchRequest) -> ClientResult<ApiVehicle> {
        self.send_json(self.client.post(self.vehicle_url(plate, "/move-branch")).json(request))
            .await
    }

    pub async fn close_sale(&self, plate: &str, request: &SaleRequest) -> ClientResult<ApiVehicle> {
        if request.sale_price < 0.0 {
            return Err(ClientError::Rejected(
                "El precio de venta no puede ser negativo".to_string(),
            ));
        }
        self.send_json(self.client.post(self.vehicle_url(plate, "/sale")).json(request))
            .await
    }

    pub async fn get_sale(&self, plate: &str) -> ClientResult<SaleSummary> {
        self.send_json(self.client.get(self.vehicle_url(plate, "/sale"))).await
    }

    pub async fn vehicle_kpis(&self, plate: &str) -> ClientResult<VehicleKpis> {
        self.send_json(self.client.get(self.vehicle_url(plate, "/kpis"))).await
    }

    pub async fn timeline(
        &self,
        plate: &str,
        limit: Option<i64>,
        types: &[VehicleEventType],
    ) -> ClientResult<Vec<TimelineEntry>> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        params.extend(types.iter().map(|t| ("type", t.as_str().to_string())));
        let request = self.client.get(self.vehicle_url(plate, "/timeline")).query(&params);
        self.send_json(request).await
    }

    // --- Gastos ---

    pub async fn list_expenses(&self, plate: &str) -> ClientResult<Vec<VehicleExpense>> {
        self.send_json(self.client.get(self.vehicle_url(plate, "/expenses"))).await
    }

    pub async fn create_expense(
        &self,
        plate: &str,
        request: &CreateExpenseRequest,
    ) -> ClientResult<VehicleExpense> {
        self.send_json(self.client.post(self.vehicle_url(plate, "/expenses")).json(request))
            .await
    }

    pub async fn update_expense(
        &self,
        plate: &str,
        expense_id: i64,
        request: &UpdateExpenseRequest,
    ) -> ClientResult<VehicleExpense> {
        let url = self.vehicle_url(plate, &format!("/expenses/{}", expense_id));
        self.send_json(self.client.patch(url).json(request)).await
    }

    pub async fn delete_expense(&self, plate: &str, expense_id: i64) -> ClientResult<()> {
        let url = self.vehicle_url(plate, &format!("/expenses/{}", expense_id));
        self.send_empty(self.client.delete(url)).await
    }

    // --- Visitas ---

    pub async fn list_visits(&self, plate: &str) -> ClientResult<Vec<VehicleVisit>> {
        self.send_json(self.client.get(self.vehicle_url(plate, "/visits"))).await
    }

    pub async fn create_visit(&self, plate: &str, request: &VisitRequest) -> ClientResult<VehicleVisit> {
        self.send_json(self.client.post(self.vehicle_url(plate, "/visits")).json(request))
            .await
    }

    pub async fn update_visit(
        &self,
        plate: &str,
        visit_id: i64,
        request: &VisitRequest,
    ) -> ClientResult<VehicleVisit> {
        let url = self.vehicle_url(plate, &format!("/visits/{}", visit_id));
        self.send_json(self.client.patch(url).json(request)).await
    }

    pub async fn delete_visit(&self, plate: &str, visit_id: i64) -> ClientResult<()> {
        let url = self.vehicle_url(plate, &format!("/visits/{}", visit_id));
        self.send_empty(self.client.delete(url)).await
    }

    pub async fn sync_visit_calendar(&self, visit_id: i64) -> ClientResult<VehicleVisit> {
        let url = self.url(&format!("/visits/{}/calendar/sync", visit_id));
        self.send_json(self.client.post(url)).await
    }

    // --- Enlaces ---

    /// Los backends sin endpoint de enlaces responden 404 "Not Found": se
    /// trata como lista vacía
    pub async fn list_links(&self, plate: &str) -> ClientResult<Vec<VehicleLink>> {
        match self.send_json(self.client.get(self.vehicle_url(plate, "/links"))).await {
            Err(ClientError::Status { status: 404, body }) if body.contains("Not Found") => {
                debug!("Endpoint de enlaces no disponible para {}", plate);
                Ok(Vec::new())
            }
            other => other,
        }
    }

    pub async fn create_link(&self, plate: &str, request: &CreateLinkRequest) -> ClientResult<VehicleLink> {
        self.send_json(self.client.post(self.vehicle_url(plate, "/links")).json(request))
            .await
    }

    pub async fn delete_link(&self, plate: &str, link_id: i64) -> ClientResult<()> {
        let url = self.vehicle_url(plate, &format!("/links/{}", link_id));
        self.send_empty(self.client.delete(url)).await
    }

    // --- Ficheros ---

    pub async fn list_files(
        &self,
        plate: &str,
        category: Option<FileCategory>,
    ) -> ClientResult<Vec<VehicleFile>> {
        let mut request = self.client.get(self.vehicle_url(plate, "/files"));
        if let Some(category) = category {
            request = request.query(&[("category", category.as_str())]);
        }
        self.send_json(request).await
    }

    pub async fn upload_file(&self, plate: &str, upload: FileUpload) -> ClientResult<VehicleFile> {
        let mut part = multipart::Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime) = upload.mime_type {
            part = part.mime_str(&mime)?;
        }
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("category", upload.category.as_str());
        if let Some(notes) = upload.notes {
            form = form.text("notes", notes);
        }
        self.send_json(self.client.post(self.vehicle_url(plate, "/files")).multipart(form))
            .await
    }

    pub async fn delete_file(&self, plate: &str, file_id: i64) -> ClientResult<()> {
        let url = self.vehicle_url(plate, &format!("/files/{}", file_id));
        self.send_empty(self.client.delete(url)).await
    }

    // --- Informes ---

    pub async fn report_kpis(&self, filters: &ReportQuery) -> ClientResult<KpiReport> {
        self.send_json(self.client.get(self.url("/reports/kpis")).query(filters)).await
    }

    pub async fn report_vehicles(&self, filters: &ReportQuery) -> ClientResult<Vec<VehicleReportRow>> {
        self.send_json(self.client.get(self.url("/reports/vehicles")).query(filters))
            .await
    }

    pub async fn report_by_branch(&self, filters: &ReportQuery) -> ClientResult<Vec<BranchReportRow>> {
        self.send_json(self.client.get(self.url("/reports/by-branch")).query(filters))
            .await
    }

    pub async fn dashboard(&self, filter: &DashboardFilter) -> ClientResult<DashboardSummary> {
        self.send_json(self.client.get(self.url("/dashboard")).query(filter)).await
    }

    /// CSV en texto plano
    pub async fn export_csv(&self, resource: ExportResource) -> ClientResult<String> {
        let url = self.url(&format!("/export/{}", resource.as_str()));
        self.send_text(self.client.get(url)).await
    }

    // --- Administración ---

    pub async fn create_backup(&self, request: &BackupCreateRequest) -> ClientResult<BackupCreated> {
        self.send_json(self.client.post(self.url("/admin/backups")).json(request))
            .await
    }

    pub async fn list_backups(&self) -> ClientResult<Vec<BackupListItem>> {
        self.send_json(self.client.get(self.url("/admin/backups"))).await
    }

    pub async fn restore_backup(
        &self,
        backup_id: &str,
        request: &BackupRestoreRequest,
    ) -> ClientResult<RestoreResult> {
        if request.wipe_before_restore && !request.confirm_wipe {
            return Err(ClientError::Rejected("confirm_wipe es requerido".to_string()));
        }
        let url = self.url(&format!(
            "/admin/backups/{}/restore",
            urlencoding::encode(backup_id)
        ));
        self.send_json(self.client.post(url).json(request)).await
    }

    pub async fn wipe(&self, request: &WipeRequest) -> ClientResult<WipeResult> {
        if !request.confirm_wipe {
            return Err(ClientError::Rejected("confirm_wipe es requerido".to_string()));
        }
        self.send_json(self.client.post(self.url("/admin/wipe")).json(request))
            .await
    }

    // --- Google Calendar ---

    pub async fn google_status(&self) -> ClientResult<GoogleStatusResponse> {
        self.send_json(self.client.get(self.url("/auth/google/status"))).await
    }

    /// URL que el navegador debe abrir para conectar Google Calendar
    pub fn google_auth_start_url(&self) -> String {
        self.url("/auth/google/start")
    }
}

/// Matrícula lista para ir en una ruta: recortada, en mayúsculas y
/// codificada
pub fn encode_plate(plate: &str) -> String {
    urlencoding::encode(&plate.trim().to_uppercase()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plate() {
        assert_eq!(encode_plate(" 1234abc "), "1234ABC");
        assert_eq!(encode_plate("B 1234 XY"), "B%201234%20XY");
        assert_eq!(encode_plate("a/b"), "A%2FB");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(
            client.vehicle_url(" 1234abc", "/expenses"),
            "http://localhost:8000/vehicles/1234ABC/expenses"
        );
        assert_eq!(
            client.google_auth_start_url(),
            "http://localhost:8000/auth/google/start"
        );
    }
}
