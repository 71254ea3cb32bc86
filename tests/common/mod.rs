//! Utilidades compartidas por los tests de integración: una app completa
//! sobre un directorio temporal con su propia base SQLite.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use sahocars::config::{DatabaseConfig, EnvironmentConfig};
use sahocars::database::connection::{run_migrations, seed_branches};
use sahocars::{create_app_router, AppState};

pub const BOUNDARY: &str = "sahocars-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    /// App accesible desde loopback
    pub async fn new() -> Self {
        Self::with_peer(SocketAddr::from(([127, 0, 0, 1], 40000))).await
    }

    /// App cuyas peticiones llegan desde `peer`
    pub async fn with_peer(peer: SocketAddr) -> Self {
        Self::build(peer, |_| {}).await
    }

    /// App en loopback con la configuración retocada por `configure`
    pub async fn with_config(configure: impl FnOnce(&mut EnvironmentConfig)) -> Self {
        Self::build(SocketAddr::from(([127, 0, 0, 1], 40000)), configure).await
    }

    async fn build(peer: SocketAddr, configure: impl FnOnce(&mut EnvironmentConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EnvironmentConfig::for_data_dir(dir.path());
        configure(&mut config);
        std::fs::create_dir_all(&config.storage_root).unwrap();
        std::fs::create_dir_all(&config.backup_dir).unwrap();

        let pool = DatabaseConfig::new(config.database_url.clone())
            .create_test_pool()
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        seed_branches(&pool, &config.default_branches).await.unwrap();

        let state = AppState::new(pool, config);
        let router = create_app_router(state.clone()).layer(MockConnectInfo(peer));
        Self { router, state, dir }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Petición JSON; devuelve el estado y el cuerpo (Null si no es JSON)
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        let bytes = body_bytes(response).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, None).await
    }

    /// Subida multipart con los campos de texto y un fichero opcional
    pub async fn multipart(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        self.send(request).await
    }

    /// Alta de un vehículo mínimo en la sucursal 1
    pub async fn create_vehicle(&self, plate: &str) -> Value {
        let (status, body) = self.post("/vehicles", vehicle_payload(plate)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

pub fn vehicle_payload(plate: &str) -> Value {
    json!({
        "license_plate": plate,
        "vin": format!("VIN-{}", plate),
        "brand": "Seat",
        "model": "Ibiza",
        "year": 2019,
        "km": 85000,
        "branch_id": 1,
        "purchase_price": 6000.0,
        "purchase_date": "2024-01-10",
    })
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
