mod common;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sahocars::repositories::GoogleTokenRepository;
use sahocars::services::calendar_service::{CalendarService, GoogleEndpoints};
use sahocars::utils::errors::AppError;

use common::TestApp;

async fn google_app() -> TestApp {
    TestApp::with_config(|config| {
        config.google.client_id = Some("client-1".to_string());
        config.google.client_secret = Some("secret-1".to_string());
        config.google.base_url = Some("http://localhost:8000".to_string());
    })
    .await
}

fn calendar(app: &TestApp, server: &MockServer) -> CalendarService {
    CalendarService::new(&app.state).with_endpoints(GoogleEndpoints {
        auth_url: format!("{}/auth", server.uri()),
        token_url: format!("{}/token", server.uri()),
        calendar_api: format!("{}/calendars", server.uri()),
    })
}

/// Conecta la cuenta pasando por la URL de consentimiento y el callback
async fn connect(service: &CalendarService) {
    let auth_url = service.auth_url().await.unwrap();
    let url = reqwest::Url::parse(&auth_url).unwrap();
    let oauth_state = url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    service
        .handle_callback(Some("codigo-1"), Some(&oauth_state))
        .await
        .unwrap();
}

async fn mount_code_exchange(server: &MockServer, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=codigo-1"))
        .and(body_string_contains("client_secret=secret-1"))
        .and(body_string_contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fgoogle%2Fcallback",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": expires_in,
            "scope": "https://www.googleapis.com/auth/calendar.events",
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_callback_exchanges_code_and_stores_token() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, 3600).await;
    let app = google_app().await;
    let service = calendar(&app, &server);

    let auth_url = service.auth_url().await.unwrap();
    assert!(auth_url.starts_with(&format!("{}/auth?", server.uri())));
    assert!(auth_url.contains("access_type=offline"));
    let url = reqwest::Url::parse(&auth_url).unwrap();
    let oauth_state = url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    let err = service
        .handle_callback(Some("codigo-1"), Some("otro-state"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Estado OAuth invalido"));

    service
        .handle_callback(Some("codigo-1"), Some(&oauth_state))
        .await
        .unwrap();

    let token = GoogleTokenRepository::new(app.state.pool.clone())
        .latest()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.access_token, "access-1");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert!(token.expiry.is_some());

    let status = service.status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.expired, Some(false));
    assert_eq!(
        status.scopes,
        Some(vec!["https://www.googleapis.com/auth/calendar.events".to_string()])
    );

    // el state solo vale una vez
    let err = service
        .handle_callback(Some("codigo-1"), Some(&oauth_state))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_access_token_refreshes_near_expiry() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, 30).await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 3600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = google_app().await;
    let service = calendar(&app, &server);
    connect(&service).await;

    assert_eq!(service.access_token().await.unwrap(), "access-2");

    // Google no reenvía el refresh_token: se conserva el anterior
    let token = GoogleTokenRepository::new(app.state.pool.clone())
        .latest()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.access_token, "access-2");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));

    // ya vigente: no vuelve a refrescar
    assert_eq!(service.access_token().await.unwrap(), "access-2");
}

#[tokio::test]
async fn test_sync_creates_then_updates_event() {
    let server = MockServer::start().await;
    mount_code_exchange(&server, 3600).await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_string_contains("Visita vehiculo 1234ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-1",
            "htmlLink": "https://calendar.google.com/event?eid=evt-1",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/calendars/primary/events/evt-1"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "evt-1",
            "htmlLink": "https://calendar.google.com/event?eid=evt-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = google_app().await;
    app.create_vehicle("1234ABC").await;
    let (status, visit) = app
        .post(
            "/vehicles/1234ABC/visits",
            json!({
                "visit_date": "2024-02-10",
                "name": "Ana",
                "phone": "600111222",
                "scheduled_at": "2024-02-10T10:30:00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let visit_id = visit["id"].as_i64().unwrap();

    let service = calendar(&app, &server);
    connect(&service).await;

    let synced = service.sync_visit(visit_id).await.unwrap();
    assert_eq!(synced.calendar_status.as_deref(), Some("synced"));
    assert_eq!(synced.calendar_event_id.as_deref(), Some("evt-1"));
    assert_eq!(
        synced.calendar_event_html_link.as_deref(),
        Some("https://calendar.google.com/event?eid=evt-1")
    );
    assert_eq!(synced.calendar_last_error, None);
    assert!(synced.calendar_last_synced_at.is_some());

    let resynced = service.sync_visit(visit_id).await.unwrap();
    assert_eq!(resynced.calendar_status.as_deref(), Some("synced"));
    assert_eq!(resynced.calendar_event_id.as_deref(), Some("evt-1"));

    let (_, visits) = app.get("/vehicles/1234ABC/visits").await;
    assert_eq!(visits[0]["calendar_status"], "synced");
}
