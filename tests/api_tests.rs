mod common;

use std::net::SocketAddr;

use axum::http::{header, StatusCode};
use serde_json::json;

use sahocars::domain::vehicle_storage_key;

use common::{body_bytes, body_json, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["checks"]["db_readwrite"], true);
    assert_eq!(body["checks"]["storage_readwrite"], true);
    assert_eq!(body["checks"]["backups_readwrite"], true);
    assert_eq!(body["checks"]["migrations"], true);
}

#[tokio::test]
async fn test_version() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/version").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_version"], "dev");
    assert_eq!(body["env"], "test");
    assert_eq!(body["schema_version"], "sqlx_migration:1");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/no-existe").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_branch_crud() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/branches").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Montgat"));
    assert!(names.contains(&"Juneda"));

    let (status, created) = app.post("/branches", json!({ "name": "Lleida" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, _) = app.post("/branches", json!({ "name": "Lleida" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, renamed) = app
        .patch(&format!("/branches/{}", id), json!({ "name": "Lleida Centro" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Lleida Centro");

    let (status, body) = app.delete(&format!("/branches/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_branch_delete_refused_while_in_use() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, body) = app.delete("/branches/1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "La sucursal tiene vehiculos asociados");
}

#[tokio::test]
async fn test_vehicle_create_and_read() {
    let app = TestApp::new().await;
    let created = app.create_vehicle(" 1234abc ").await;

    assert_eq!(created["license_plate"], "1234ABC");
    assert_eq!(created["status"], "intake");
    assert_eq!(created["total_expenses"], 0.0);
    assert!(created["profit"].is_null());

    let (status, body) = app.get("/vehicles/1234abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["license_plate"], "1234ABC");

    // id numérico antiguo
    let legacy_id = created["id"].as_i64().unwrap();
    let (status, body) = app.get(&format!("/vehicles/{}", legacy_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["license_plate"], "1234ABC");

    let (status, _) = app.get("/vehicles/0000ZZZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicle_create_errors() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app.post("/vehicles", common::vehicle_payload("1234abc")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut payload = common::vehicle_payload("5678DEF");
    payload["year"] = json!(1800);
    let (status, body) = app.post("/vehicles", payload).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut payload = common::vehicle_payload("5678DEF");
    payload["branch_id"] = json!(999);
    let (status, _) = app.post("/vehicles", payload).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicle_list_accepts_legacy_filters() {
    let app = TestApp::new().await;
    app.create_vehicle("1111AAA").await;
    app.create_vehicle("2222BBB").await;
    let (status, _) = app
        .post("/vehicles/2222BBB/status", json!({ "to_status": "prep" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/vehicles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = app.get("/vehicles?state=prep&location_id=1").await;
    let vehicles = body.as_array().unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0]["license_plate"], "2222BBB");

    let (_, body) = app.get("/vehicles?branch_id=2").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_vehicle_update() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app
        .patch("/vehicles/1234ABC", json!({ "license_plate": "9999ZZZ" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .patch("/vehicles/1234ABC", json!({ "km": 90000, "notes": "ITV pasada", "status": "sold" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["km"], 90000);
    assert_eq!(body["notes"], "ITV pasada");
    assert_eq!(body["status"], "intake");

    let (_, timeline) = app.get("/vehicles/1234ABC/timeline?type=VEHICLE_UPDATED").await;
    let entries = timeline.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "VEHICLE_UPDATED");
}

#[tokio::test]
async fn test_vehicle_delete_removes_files() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;
    let response = app
        .multipart("/vehicles/1234ABC/files", &[], Some(("foto.jpg", "image/jpeg", b"jpeg")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let dir = app
        .state
        .config
        .storage_root
        .join("vehicles")
        .join(vehicle_storage_key("1234ABC"));
    assert!(dir.exists());

    let (status, body) = app.delete("/vehicles/1234ABC").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(!dir.exists());

    let (status, _) = app.get("/vehicles/1234ABC").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicle_delete_keeps_files_of_plates_sharing_folder() {
    let app = TestApp::new().await;
    app.create_vehicle("AB.12").await;
    app.create_vehicle("AB_12").await;
    assert_eq!(vehicle_storage_key("AB.12"), vehicle_storage_key("AB_12"));

    let response = app
        .multipart("/vehicles/AB.12/files", &[], Some(("foto.jpg", "image/jpeg", b"punto")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app
        .multipart("/vehicles/AB_12/files", &[], Some(("foto.jpg", "image/jpeg", b"guion")))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let kept = body_json(response).await;
    let kept_id = kept["id"].as_i64().unwrap();

    let (status, _) = app.delete("/vehicles/AB.12").await;
    assert_eq!(status, StatusCode::OK);

    let request = axum::http::Request::builder()
        .uri(format!("/vehicles/AB_12/files/{}/download", kept_id))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"guion".to_vec());

    let dir = app
        .state
        .config
        .storage_root
        .join("vehicles")
        .join(vehicle_storage_key("AB_12"));
    let remaining = std::fs::read_dir(&dir).unwrap().count();
    assert_eq!(remaining, 1);

    let (status, _) = app.delete("/vehicles/AB_12").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_status_workflow() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, body) = app
        .post("/vehicles/1234ABC/status", json!({ "to_status": "published" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Transicion invalida: intake -> published");

    let (status, _) = app
        .post("/vehicles/1234ABC/status", json!({ "to_status": "intake" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for to in ["prep", "ready", "published"] {
        let (status, body) = app
            .post("/vehicles/1234ABC/status", json!({ "to_status": to, "note": "ok" }))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["status"], to);
    }

    let (status, body) = app
        .post(
            "/vehicles/1234ABC/status",
            json!({ "to_status": "reserved", "reserved_until": "2024-06-30" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reserved_until"], "2024-06-30");
    assert_eq!(body["status_reason"], serde_json::Value::Null);

    let (status, body) = app
        .post("/vehicles/1234ABC/status", json!({ "to_status": "published" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reserved_until"].is_null());

    let (status, events) = app.get("/vehicles/1234ABC/status/events?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["from_status"], "reserved");
    assert_eq!(events[0]["to_status"], "published");

    let (_, timeline) = app.get("/vehicles/1234ABC/timeline?type=STATUS_CHANGE").await;
    assert_eq!(timeline.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_sale_close() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app.get("/vehicles/1234ABC/sale").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // intake no puede pasar a vendido
    let (status, _) = app
        .post("/vehicles/1234ABC/sale", json!({ "sale_price": 9000.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for to in ["ready", "published"] {
        let (status, _) = app
            .post("/vehicles/1234ABC/status", json!({ "to_status": to }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app
        .post("/vehicles/1234ABC/sale", json!({ "sale_price": -1.0 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .post(
            "/vehicles/1234ABC/sale",
            json!({ "sale_price": 9000.0, "sold_at": "2024-03-01", "sale_notes": "Pago al contado" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "sold");
    assert_eq!(body["sold_at"], "2024-03-01");
    assert_eq!(body["sale_date"], "2024-03-01");
    assert_eq!(body["profit"], 9000.0);

    let (status, sale) = app.get("/vehicles/1234ABC/sale").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["sale_price"], 9000.0);
    assert_eq!(sale["sale_notes"], "Pago al contado");

    let (status, _) = app
        .post("/vehicles/1234ABC/status", json!({ "to_status": "ready" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, timeline) = app.get("/vehicles/1234ABC/timeline?type=SALE_CLOSED").await;
    assert_eq!(timeline.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_move_branch() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app
        .post("/vehicles/1234ABC/move-branch", json!({ "to_branch_id": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/vehicles/1234ABC/move-branch", json!({ "to_branch_id": 99 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/vehicles/1234ABC/move-branch",
            json!({ "to_branch_id": 2, "note": "Cliente en Juneda" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["branch_id"], 2);

    let (_, timeline) = app.get("/vehicles/1234ABC/timeline?type=BRANCH_MOVED").await;
    let entries = timeline.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["payload"]["from_branch_name"], "Montgat");
    assert_eq!(entries[0]["payload"]["to_branch_name"], "Juneda");
}

#[tokio::test]
async fn test_expenses() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app
        .post(
            "/vehicles/1234ABC/expenses",
            json!({ "amount": 0.0, "date": "2024-02-01", "category": "MECHANICAL" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post(
            "/vehicles/1234ABC/expenses",
            json!({ "amount": 10.0, "date": "2024-02-01", "category": "OTHER", "linked_vehicle_file_id": 77 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, expense) = app
        .post(
            "/vehicles/1234ABC/expenses",
            json!({ "amount": 250.5, "date": "2024-02-01", "category": "MECHANICAL", "vendor": "Taller Pep" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["currency"], "EUR");
    let expense_id = expense["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/vehicles/1234ABC/expenses",
            json!({ "amount": 6000.0, "date": "2024-01-10", "category": "PURCHASE" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // la compra no cuenta en total_expenses
    let (_, vehicle) = app.get("/vehicles/1234ABC").await;
    assert_eq!(vehicle["total_expenses"], 250.5);

    let (status, updated) = app
        .patch(
            &format!("/vehicles/1234ABC/expenses/{}", expense_id),
            json!({ "amount": 300.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["amount"], 300.0);
    assert_eq!(updated["vendor"], "Taller Pep");

    let (status, _) = app
        .delete(&format!("/vehicles/1234ABC/expenses/{}", expense_id))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, expenses) = app.get("/vehicles/1234ABC/expenses").await;
    assert_eq!(expenses.as_array().unwrap().len(), 1);

    let (_, timeline) = app
        .get("/vehicles/1234ABC/timeline?type=EXPENSE_CREATED,EXPENSE_UPDATED&type=EXPENSE_DELETED")
        .await;
    assert_eq!(timeline.as_array().unwrap().len(), 4);

    let (status, kpis) = app.get("/vehicles/1234ABC/kpis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kpis["vehicle_id"], "1234ABC");
}

#[tokio::test]
async fn test_visits() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, body) = app
        .post(
            "/vehicles/1234ABC/visits",
            json!({ "visit_date": "2024-02-10", "name": "Ana" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "Telefono o email es requerido");

    let (status, visit) = app
        .post(
            "/vehicles/1234ABC/visits",
            json!({ "visit_date": "2024-02-10", "name": "Ana", "phone": "600111222" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let visit_id = visit["id"].as_i64().unwrap();

    let (status, updated) = app
        .patch(
            &format!("/vehicles/1234ABC/visits/{}", visit_id),
            json!({ "notes": "Quiere probarlo el sabado" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ana");
    assert_eq!(updated["phone"], "600111222");
    assert_eq!(updated["notes"], "Quiere probarlo el sabado");

    let (_, visits) = app.get("/vehicles/1234ABC/visits").await;
    assert_eq!(visits.as_array().unwrap().len(), 1);

    let (status, _) = app
        .delete(&format!("/vehicles/1234ABC/visits/{}", visit_id))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.post("/visits/999/calendar/sync", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_links() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app
        .post("/vehicles/1234ABC/links", json!({ "url": "javascript:alert(1)" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, link) = app
        .post(
            "/vehicles/1234ABC/links",
            json!({ "title": "Anuncio", "url": "https://www.coches.net/anuncio/123" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, links) = app.get("/vehicles/1234ABC/links").await;
    assert_eq!(links.as_array().unwrap().len(), 1);

    let (status, _) = app
        .delete(&format!("/vehicles/1234ABC/links/{}", link["id"]))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, links) = app.get("/vehicles/1234ABC/links").await;
    assert!(links.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_file_upload_download_delete() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let response = app
        .multipart(
            "/vehicles/1234ABC/files",
            &[("category", "document"), ("notes", "Factura de taller")],
            Some(("factura taller.pdf", "application/pdf", b"%PDF-1.4 contenido")),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let file = body_json(response).await;
    assert_eq!(file["stored_name"], "factura_taller.pdf");
    assert_eq!(file["category"], "document");
    assert_eq!(file["size_bytes"], 18);

    // mismo nombre: se guarda con sufijo
    let response = app
        .multipart(
            "/vehicles/1234ABC/files",
            &[],
            Some(("factura taller.pdf", "application/pdf", b"otra")),
        )
        .await;
    let second = body_json(response).await;
    assert_eq!(second["stored_name"], "factura_taller_1.pdf");

    let response = app
        .multipart("/vehicles/1234ABC/files", &[("category", "video")], Some(("a.mp4", "video/mp4", b"x")))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.multipart("/vehicles/1234ABC/files", &[("category", "photo")], None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let (_, photos) = app.get("/vehicles/1234ABC/files?category=photo").await;
    assert!(photos.as_array().unwrap().is_empty());
    let (_, all) = app.get("/vehicles/1234ABC/files").await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let file_id = file["id"].as_i64().unwrap();
    let request = axum::http::Request::builder()
        .uri(format!("/vehicles/1234ABC/files/{}/download", file_id))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(body_bytes(response).await, b"%PDF-1.4 contenido".to_vec());

    let (status, _) = app
        .delete(&format!("/vehicles/1234ABC/files/{}", file_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    let path = app
        .state
        .config
        .storage_root
        .join("vehicles/1234ABC/factura_taller.pdf");
    assert!(!path.exists());

    let (_, timeline) = app
        .get("/vehicles/1234ABC/timeline?type=FILE_UPLOADED&type=FILE_DELETED")
        .await;
    assert_eq!(timeline.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_timeline_rejects_unknown_type() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let (status, _) = app.get("/vehicles/1234ABC/timeline?type=NOPE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_are_local_only() {
    let app = TestApp::with_peer(SocketAddr::from(([192, 168, 1, 50], 51000))).await;

    let (status, body) = app.get("/admin/backups").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Acceso solo local");

    let (status, _) = app.get("/auth/google/status").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // el resto de la API sigue abierta
    let (status, _) = app.get("/branches").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_google_status_disconnected() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/auth/google/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "connected": false }));
}

#[tokio::test]
async fn test_google_start_requires_client_id() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/auth/google/start").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Falta GOOGLE_CLIENT_ID en entorno");
}

#[tokio::test]
async fn test_google_callback_requires_code() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/auth/google/callback?state=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Codigo OAuth faltante");
}

#[tokio::test]
async fn test_reports() {
    let app = TestApp::new().await;
    app.create_vehicle("1111AAA").await;
    app.create_vehicle("2222BBB").await;

    let (status, body) = app.get("/reports/kpis?status=vendido").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Estado invalido");

    let (status, kpis) = app.get("/reports/kpis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kpis["vehicles_total"], 2);
    assert_eq!(kpis["vehicles_sold"], 0);

    let (status, rows) = app.get("/reports/vehicles?branch_id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/reports/by-branch").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/dashboard").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_csv_export() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;

    let request = axum::http::Request::builder()
        .uri("/export/vehicles")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("1234ABC"));

    let (status, _) = app.get("/export/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_sync_failure_is_recorded_on_visit() {
    let app = TestApp::new().await;
    app.create_vehicle("1234ABC").await;
    let (status, visit) = app
        .post(
            "/vehicles/1234ABC/visits",
            json!({
                "visit_date": "2024-02-10",
                "name": "Ana",
                "email": "ana@example.com",
                "scheduled_at": "2024-02-10T10:30:00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, synced) = app
        .post(&format!("/visits/{}/calendar/sync", visit["id"]), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(synced["calendar_status"], "error");
    assert_eq!(synced["calendar_last_error"], "Google Calendar no conectado");
    assert!(synced["calendar_event_id"].is_null());
}
