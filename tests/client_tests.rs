use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sahocars::client::{ApiClient, ClientError};
use sahocars::domain::{StatusChange, VehicleStatus};
use sahocars::dto::WipeRequest;
use sahocars::models::VehicleEventType;
use sahocars::services::ExportResource;

async fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(format!("{}/", server.uri())).unwrap()
}

#[tokio::test]
async fn test_vehicle_from_legacy_backend_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vehicles/1234ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "license_plate": "1234ABC",
            "location_id": 2,
            "state": "published",
            "km": 85000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let vehicle = client.get_vehicle(" 1234abc").await.unwrap();

    assert_eq!(vehicle.branch_id, Some(2));
    assert_eq!(vehicle.location_id, Some(2));
    assert_eq!(vehicle.status, VehicleStatus::Published);
    assert_eq!(vehicle.state, VehicleStatus::Published);
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vehicles/0000ZZZ"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Vehiculo no encontrado"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/branches"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let err = client.get_vehicle("0000ZZZ").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Vehiculo no encontrado");

    let err = client.list_branches().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Error 500");
}

#[tokio::test]
async fn test_missing_links_endpoint_reads_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vehicles/1234ABC/links"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"detail\":\"Not Found\"}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vehicles/5678DEF/links"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    assert!(client.list_links("1234ABC").await.unwrap().is_empty());
    let err = client.list_links("5678DEF").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server).await;

    let err = client
        .change_status("1234ABC", &StatusChange::new(VehicleStatus::Published), Some(VehicleStatus::Intake))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));

    let err = client
        .change_status("1234ABC", &StatusChange::new(VehicleStatus::Reserved), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));

    let err = client
        .change_status("1234ABC", &StatusChange::new(VehicleStatus::Sold), None)
        .await
        .unwrap_err();
    match err {
        ClientError::Rejected(message) => {
            assert_eq!(message, "sold_at es requerido para marcar como vendido")
        }
        other => panic!("error inesperado: {:?}", other),
    }

    let err = client
        .wipe(&WipeRequest { confirm_wipe: false })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));
}

#[tokio::test]
async fn test_timeline_repeats_type_param() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vehicles/1234ABC/timeline"))
        .and(query_param("limit", "10"))
        .and(query_param("type", "STATUS_CHANGE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let entries = client
        .timeline("1234ABC", Some(10), &[VehicleEventType::StatusChange])
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_export_csv_returns_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/expenses"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/csv; charset=utf-8")
                .set_body_string("id,vehicle_id\n1,1234ABC"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let csv = client.export_csv(ExportResource::Expenses).await.unwrap();
    assert_eq!(csv, "id,vehicle_id\n1,1234ABC");
}

#[tokio::test]
async fn test_plate_is_encoded_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/vehicles/AB%2012"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.delete_vehicle("ab 12").await.unwrap();
}
