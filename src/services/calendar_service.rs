//! Servicio para Google Calendar
//!
//! Autorización OAuth (offline, con refresh token) y sincronización de una
//! visita con un evento del calendario. La sincronización es de un solo
//! sentido y best-effort: el resultado, bueno o malo, queda guardado en la
//! propia visita.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, NaiveDateTime, Utc};
use rand::RngCore;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::GoogleConfig;
use crate::dto::GoogleStatusResponse;
use crate::models::{GoogleToken, Vehicle, VehicleVisit};
use crate::repositories::{
    BranchRepository, CalendarSyncState, GoogleTokenRepository, TokenGrant, VehicleRepository,
    VisitRepository,
};
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, internal_error, not_found_error, AppError, AppResult};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
pub const DEFAULT_TIMEZONE: &str = "Europe/Madrid";
pub const DEFAULT_DURATION_MINUTES: i64 = 30;
/// A dónde vuelve el navegador tras conectar la cuenta
pub const AFTER_CONNECT_REDIRECT: &str = "/settings/integrations";

const REFRESH_MARGIN_SECONDS: i64 = 60;
const STATUS_SYNCED: &str = "synced";
const STATUS_ERROR: &str = "error";

/// URLs de Google; configurables para poder apuntar a un servidor de pruebas
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub calendar_api: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            calendar_api: "https://www.googleapis.com/calendar/v3/calendars".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEvent {
    id: Option<String>,
    html_link: Option<String>,
}

pub struct CalendarService {
    state: AppState,
    google: GoogleConfig,
    client: Client,
    endpoints: GoogleEndpoints,
    tokens: GoogleTokenRepository,
}

impl CalendarService {
    pub fn new(state: &AppState) -> Self {
        Self {
            google: state.config.google.clone(),
            client: state.http_client.clone(),
            endpoints: GoogleEndpoints::default(),
            tokens: GoogleTokenRepository::new(state.pool.clone()),
            state: state.clone(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// URL de consentimiento de Google; el `state` queda pendiente en memoria
    pub async fn auth_url(&self) -> AppResult<String> {
        let client_id = require(&self.google.client_id, "GOOGLE_CLIENT_ID")?;
        let redirect_uri = self.redirect_uri()?;
        let oauth_state = random_state();

        let url = Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", oauth_state.as_str()),
            ],
        )
        .map_err(internal_error)?;

        self.state.store_oauth_state(oauth_state).await;
        Ok(url.to_string())
    }

    /// Canjear el código de autorización y guardar los tokens
    pub async fn handle_callback(&self, code: Option<&str>, oauth_state: Option<&str>) -> AppResult<()> {
        let code = code
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| bad_request_error("Codigo OAuth faltante"))?;
        let oauth_state = oauth_state.ok_or_else(|| bad_request_error("Estado OAuth no disponible"))?;
        if !self.state.take_oauth_state(oauth_state).await {
            return Err(bad_request_error("Estado OAuth invalido"));
        }

        let client_id = require(&self.google.client_id, "GOOGLE_CLIENT_ID")?;
        let client_secret = require(&self.google.client_secret, "GOOGLE_CLIENT_SECRET")?;
        let redirect_uri = self.redirect_uri()?;

        let form = [
            ("code", code),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let token = self.request_token(&form, "Error al obtener token").await?;
        self.save_token(token, None).await?;
        info!("Google Calendar conectado");
        Ok(())
    }

    pub async fn status(&self) -> AppResult<GoogleStatusResponse> {
        let Some(token) = self.tokens.latest().await? else {
            return Ok(GoogleStatusResponse::disconnected());
        };
        Ok(GoogleStatusResponse {
            connected: true,
            expired: Some(token.is_expired(Utc::now())),
            scopes: Some(token.scope_list()),
            updated_at: Some(token.updated_at),
        })
    }

    /// Token de acceso válido, refrescándolo si caduca en menos de un minuto
    pub async fn access_token(&self) -> AppResult<String> {
        let token = self
            .tokens
            .latest()
            .await?
            .ok_or_else(|| bad_request_error("Google Calendar no conectado"))?;
        if !token.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECONDS)) {
            return Ok(token.access_token);
        }
        let refreshed = self.refresh(&token).await?;
        Ok(refreshed.access_token)
    }

    async fn refresh(&self, token: &GoogleToken) -> AppResult<GoogleToken> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| bad_request_error("Token expirado sin refresh_token"))?;
        let client_id = require(&self.google.client_id, "GOOGLE_CLIENT_ID")?;
        let client_secret = require(&self.google.client_secret, "GOOGLE_CLIENT_SECRET")?;

        let form = [
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self.request_token(&form, "Error al refrescar token").await?;
        info!("Token de Google Calendar refrescado");
        self.save_token(response, Some(refresh_token)).await
    }

    async fn request_token(&self, form: &[(&str, &str)], context: &str) -> AppResult<TokenResponse> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("{}: {}", context, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(bad_request_error(&format!("{}: {}", context, body)));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AppError::ExternalApi(format!("{}: {}", context, e)))
    }

    async fn save_token(&self, response: TokenResponse, fallback_refresh: Option<String>) -> AppResult<GoogleToken> {
        let now = Utc::now();
        let grant = TokenGrant {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(fallback_refresh),
            expiry: response.expires_in.map(|seconds| now + Duration::seconds(seconds)),
            scopes: response.scope,
        };
        self.tokens.upsert(&grant, now).await
    }

    /// Empujar la visita al calendario y guardar el resultado en ella
    pub async fn sync_visit(&self, visit_id: i64) -> AppResult<VehicleVisit> {
        let visits = VisitRepository::new(self.state.pool.clone());
        let visit = visits
            .find(visit_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Visita no encontrada".to_string()))?;
        let vehicle = VehicleRepository::new(self.state.pool.clone())
            .find_by_plate(&visit.vehicle_id)
            .await?
            .ok_or_else(|| not_found_error("Vehiculo"))?;
        let branch_name = BranchRepository::new(self.state.pool.clone())
            .find_by_id(vehicle.branch_id)
            .await?
            .map(|branch| branch.name);

        let sync = match self.push_event(&visit, &vehicle, branch_name.as_deref()).await {
            Ok(event) => {
                info!("Visita {} sincronizada con el calendario", visit.id);
                CalendarSyncState {
                    event_id: event.id,
                    html_link: event.html_link,
                    status: STATUS_SYNCED.to_string(),
                    last_error: None,
                    synced_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!("Sincronizacion de la visita {} fallida: {}", visit.id, e);
                CalendarSyncState {
                    event_id: None,
                    html_link: None,
                    status: STATUS_ERROR.to_string(),
                    last_error: Some(error_message(&e)),
                    synced_at: Utc::now(),
                }
            }
        };
        visits.record_calendar_sync(visit.id, &sync).await
    }

    async fn push_event(
        &self,
        visit: &VehicleVisit,
        vehicle: &Vehicle,
        branch_name: Option<&str>,
    ) -> AppResult<CalendarEvent> {
        let payload = event_payload(visit, vehicle, branch_name)
            .ok_or_else(|| bad_request_error("scheduled_at es requerido para sincronizar"))?;
        let access_token = self.access_token().await?;

        let calendar = urlencoding::encode(&self.google.calendar_id);
        let request = match visit.calendar_event_id.as_deref() {
            Some(event_id) => self.client.patch(format!(
                "{}/{}/events/{}",
                self.endpoints.calendar_api,
                calendar,
                urlencoding::encode(event_id)
            )),
            None => self
                .client
                .post(format!("{}/{}/events", self.endpoints.calendar_api, calendar)),
        };

        let response = request
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Error calendario: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!("Error calendario: {}", body)));
        }
        response
            .json::<CalendarEvent>()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Error calendario: {}", e)))
    }

    fn redirect_uri(&self) -> AppResult<String> {
        self.google
            .resolved_redirect_uri()
            .ok_or_else(|| bad_request_error("Falta SAHOCARS_BASE_URL en entorno"))
    }
}

fn require(value: &Option<String>, name: &str) -> AppResult<String> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| bad_request_error(&format!("Falta {} en entorno", name)))
}

fn random_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Texto a guardar en `calendar_last_error`
fn error_message(error: &AppError) -> String {
    match error {
        AppError::BadRequest(msg) | AppError::ExternalApi(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Hora local sin desfase: Google la interpreta en `timeZone`
fn local_date_time(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Cuerpo del evento; `None` si la visita no tiene hora
pub fn event_payload(visit: &VehicleVisit, vehicle: &Vehicle, branch_name: Option<&str>) -> Option<Value> {
    let start = visit.scheduled_at?;
    let timezone = visit
        .timezone
        .as_deref()
        .filter(|tz| !tz.trim().is_empty())
        .unwrap_or(DEFAULT_TIMEZONE);
    let duration = visit
        .duration_minutes
        .filter(|minutes| *minutes > 0)
        .unwrap_or(DEFAULT_DURATION_MINUTES);
    let end = start + Duration::minutes(duration);

    let mut payload = json!({
        "summary": format!("Visita vehiculo {}", vehicle.license_plate),
        "description": event_description(visit, vehicle),
        "start": { "dateTime": local_date_time(start), "timeZone": timezone },
        "end": { "dateTime": local_date_time(end), "timeZone": timezone },
    });
    if let Some(name) = branch_name {
        payload["location"] = json!(name);
    }
    Some(payload)
}

pub fn event_description(visit: &VehicleVisit, vehicle: &Vehicle) -> String {
    let mut lines = vec![
        format!("Vehiculo: {}", vehicle.title()),
        format!("Matricula: {}", vehicle.license_plate),
        format!("Nombre: {}", visit.name),
    ];
    if let Some(phone) = &visit.phone {
        lines.push(format!("Telefono: {}", phone));
    }
    if let Some(email) = &visit.email {
        lines.push(format!("Email: {}", email));
    }
    if let Some(notes) = &visit.notes {
        lines.push(format!("Notas: {}", notes));
    }
    lines.join("\n")
}
