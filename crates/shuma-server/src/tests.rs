//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shuma_core::ai::MockBackend;
use shuma_core::blob::into_blob;
use shuma_core::db::Database;
use shuma_core::models::ExtractionKind;
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    }
}

fn setup_test_app() -> (Router, Database) {
    setup_with_mock(MockBackend::new())
}

fn setup_with_mock(mock: MockBackend) -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = create_router_with_extractor(db.clone(), None, test_config(), Some(mock.into()));
    (app, db)
}

fn session_with_uploads(db: &Database, types: &[&str]) -> String {
    let uploads: Vec<Value> = types
        .iter()
        .map(|t| json!({"type": t, "name": format!("{}.pdf", t), "url": format!("{}.pdf", t)}))
        .collect();
    db.create_session(Some(&into_blob(json!({ "uploads": uploads }))))
        .unwrap()
        .id
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn field<'a>(fields: &'a Value, key: &str) -> &'a Value {
    fields
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["key"] == key)
        .unwrap_or_else(|| panic!("field {} missing", key))
}

// ========== Health / Registry ==========

#[tokio::test]
async fn test_health_with_mock_backend() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["extraction"]["configured"], true);
    assert_eq!(json["extraction"]["available"], true);
    assert_eq!(json["extraction"]["model"], "mock");
}

#[tokio::test]
async fn test_health_without_backend() {
    let db = Database::in_memory().unwrap();
    let app = create_router_with_extractor(db, None, test_config(), None);

    let response = app.oneshot(get("/api/health")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["extraction"]["configured"], false);
    assert!(json["extraction"]["model"].is_null());
}

#[tokio::test]
async fn test_list_sections() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/sections")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let sections = json["sections"].as_array().unwrap();
    assert!(sections
        .iter()
        .any(|s| s["id"] == "property_identification"));
    assert!(json["groups"].is_array());
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

// ========== Sessions ==========

#[tokio::test]
async fn test_session_create_get_update() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/session",
            json!({"data": {"street": "הרצל", "extractedData": {"gush": 1}}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = get_body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["street"], "הרצל");

    // Partial update: extractedData is merged, other keys assigned
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}", id),
            json!({"data": {"city": "חיפה", "extractedData": {"chelka": 2}}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/session/{}", id)))
        .await
        .unwrap();
    let session = get_body_json(response).await;
    assert_eq!(session["data"]["street"], "הרצל");
    assert_eq!(session["data"]["city"], "חיפה");
    assert_eq!(session["data"]["extractedData"]["gush"], 1);
    assert_eq!(session["data"]["extractedData"]["chelka"], 2);
}

#[tokio::test]
async fn test_create_session_without_body() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/session")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["id"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(get("/api/session/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("not found"));
}

// ========== Fields ==========

#[tokio::test]
async fn test_list_fields_resolves_with_placeholder() {
    let (app, db) = setup_test_app();
    let id = db
        .create_session(Some(&into_blob(json!({
            "extractedData": {"land_registry": {"gush": 6158}}
        }))))
        .unwrap()
        .id;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/session/{}/fields", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fields = get_body_json(response).await;

    let gush = field(&fields, "gush");
    assert_eq!(gush["value"], 6158);
    assert_eq!(gush["path"], "land_registry.gush");
    assert_eq!(field(&fields, "chelka")["display"], "לא נמצא");

    // Section filter
    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/session/{}/fields?section=property_identification",
            id
        )))
        .await
        .unwrap();
    let section = get_body_json(response).await;
    assert!(section
        .as_array()
        .unwrap()
        .iter()
        .all(|f| f["section"] == "property_identification"));

    let response = app
        .oneshot(get(&format!("/api/session/{}/fields?section=nope", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_field_records_edit_and_manual_provenance() {
    let (app, db) = setup_test_app();
    let id = db
        .create_session(Some(&into_blob(json!({
            "extractedData": {"land_registry": {"gush": 6158}}
        }))))
        .unwrap()
        .id;

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/fields/gush", id),
            json!({"value": 7000}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    // Overrides where the value currently resolves from
    assert_eq!(json["path"], "land_registry.gush");
    assert_eq!(json["old_value"], 6158);
    assert_eq!(json["new_value"], 7000);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/session/{}/fields", id)))
        .await
        .unwrap();
    let fields = get_body_json(response).await;
    let gush = field(&fields, "gush");
    assert_eq!(gush["value"], 7000);
    assert_eq!(gush["provenance"]["extraction_method"], "manual");

    let response = app
        .oneshot(get(&format!("/api/session/{}/field-edits", id)))
        .await
        .unwrap();
    let edits = get_body_json(response).await;
    let edits = edits.as_array().unwrap();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["fieldKey"], "gush");
}

#[tokio::test]
async fn test_update_field_on_empty_session_uses_first_path() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/fields/chelka", id),
            json!({"value": 12}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["path"], "chelka");
    assert!(json["old_value"].is_null());
    assert_eq!(db.get_extracted_data(&id).unwrap()["chelka"], 12);
}

#[tokio::test]
async fn test_committed_edit_survives_audit_failure() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;
    db.conn()
        .unwrap()
        .execute_batch("DROP TABLE audit_log")
        .unwrap();

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/fields/chelka", id),
            json!({"value": 12}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.get_extracted_data(&id).unwrap()["chelka"], 12);
}

#[tokio::test]
async fn test_update_unknown_field_is_404() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/fields/not_a_field", id),
            json!({"value": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Extraction ==========

#[tokio::test]
async fn test_full_extraction() {
    let (app, db) = setup_test_app();
    let id = session_with_uploads(&db, &["tabu", "permit"]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/session/{}/extract", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["processed"], json!(["tabu", "permit"]));
    assert_eq!(json["statuses"]["tabu"]["status"], "succeeded");
    assert_eq!(json["extracted_data"]["gush"], 6158);
    assert!(json["snapshot"]["id"].is_number());

    let extracted = db.get_extracted_data(&id).unwrap();
    assert_eq!(extracted["building_permit"]["permit_number"], "2019-0457");
}

#[tokio::test]
async fn test_selective_extraction_keeps_other_fields() {
    let mock = MockBackend::new();
    let (app, db) = setup_with_mock(mock.clone());
    let id = session_with_uploads(&db, &["tabu", "permit"]);
    db.update_session(
        &id,
        &into_blob(json!({"extractedData": {"gush": 100, "land_registry": {"gush": 100}}})),
    )
    .unwrap();

    let response = app
        .oneshot(send_json(
            "POST",
            &format!("/api/session/{}/extract", id),
            json!({"selection": {"permit": true, "tabu": false}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(mock.called_kinds(), vec![ExtractionKind::BuildingPermit]);
    let extracted = db.get_extracted_data(&id).unwrap();
    assert_eq!(extracted["gush"], 100);
    assert_eq!(extracted["permitNumber"], "2019-0457");
}

#[tokio::test]
async fn test_selection_accepts_call_names() {
    let mock = MockBackend::new();
    let (app, db) = setup_with_mock(mock.clone());
    let id = session_with_uploads(&db, &["tabu", "permit"]);

    let response = app
        .oneshot(send_json(
            "POST",
            &format!("/api/session/{}/extract", id),
            json!({"selection": {"land_registry": true}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["processed"], json!(["tabu"]));
    assert_eq!(mock.called_kinds(), vec![ExtractionKind::LandRegistry]);
}

#[tokio::test]
async fn test_malformed_extraction_request_is_400() {
    let mock = MockBackend::new();
    let (app, db) = setup_with_mock(mock.clone());
    let id = session_with_uploads(&db, &["tabu", "permit"]);
    db.update_session(&id, &into_blob(json!({"extractedData": {"gush": 100}})))
        .unwrap();
    let uri = format!("/api/session/{}/extract", id);

    let unknown_type = app
        .clone()
        .oneshot(send_json("POST", &uri, json!({"selection": {"deeds": true}})))
        .await
        .unwrap();
    assert_eq!(unknown_type.status(), StatusCode::BAD_REQUEST);

    let misspelled = app
        .clone()
        .oneshot(send_json("POST", &uri, json!({"selections": {"permit": true}})))
        .await
        .unwrap();
    assert_eq!(misspelled.status(), StatusCode::BAD_REQUEST);

    let not_json = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .header("content-type", "application/json")
                .body(Body::from("{selection"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);

    // Nothing ran and the stored blob is untouched
    assert!(mock.called_kinds().is_empty());
    assert_eq!(db.get_extracted_data(&id).unwrap()["gush"], 100);
    assert!(db.list_snapshots(&id, None).unwrap().is_empty());
}

#[tokio::test]
async fn test_extraction_without_backend_is_503() {
    let db = Database::in_memory().unwrap();
    let id = session_with_uploads(&db, &["tabu"]);
    let app = create_router_with_extractor(db, None, test_config(), None);

    let response = app
        .oneshot(send_json(
            "POST",
            &format!("/api/session/{}/extract", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_extraction_all_failed_is_502() {
    let mock = MockBackend::new().with_failure(ExtractionKind::LandRegistry, "overloaded");
    let (app, db) = setup_with_mock(mock);
    let id = session_with_uploads(&db, &["tabu"]);

    let response = app
        .oneshot(send_json(
            "POST",
            &format!("/api/session/{}/extract", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(db.list_snapshots(&id, None).unwrap().is_empty());
}

// ========== Snapshots ==========

#[tokio::test]
async fn test_snapshot_list_and_restore() {
    let (app, db) = setup_test_app();
    let id = session_with_uploads(&db, &["permit"]);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/session/{}/extract", id),
            json!({}),
        ))
        .await
        .unwrap();
    let outcome = get_body_json(response).await;
    let snapshot_id = outcome["snapshot"]["id"].as_i64().unwrap();

    // Manual edit after the run
    db.update_extracted_field(&id, "permitNumber", "permitNumber", json!("P-EDITED"))
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/session/{}/ai-extractions", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshots = get_body_json(response).await;
    assert_eq!(snapshots.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/ai-extractions", id),
            json!({"extractionId": snapshot_id, "action": "restore"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let restored = get_body_json(response).await;
    assert_eq!(restored["changed_keys"], json!(["permitNumber"]));
    assert_eq!(
        db.get_extracted_data(&id).unwrap()["permitNumber"],
        "2019-0457"
    );

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/ai-extractions", id),
            json!({"extractionId": snapshot_id, "action": "delete"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_snapshot_and_filter_by_type() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/session/{}/ai-extractions", id),
            json!({"extractedFields": {"gush": 1}, "extractionType": "manual_import"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/session/{}/ai-extractions?type=manual_import",
            id
        )))
        .await
        .unwrap();
    let snapshots = get_body_json(response).await;
    assert_eq!(snapshots.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get(&format!(
            "/api/session/{}/ai-extractions?type=combined",
            id
        )))
        .await
        .unwrap();
    let snapshots = get_body_json(response).await;
    assert!(snapshots.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_restore_unknown_snapshot_is_404() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/session/{}/ai-extractions", id),
            json!({"extractionId": 9999, "action": "restore"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Provenance ==========

#[tokio::test]
async fn test_provenance_create_and_list() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/provenance",
            json!({
                "sessionId": id,
                "field_path": "land_registry.gush",
                "document_name": "נסח.pdf",
                "page_number": 1,
                "confidence": 0.9,
                "extraction_method": "ai",
                "bbox": "{\"x\":1,\"y\":2,\"width\":3,\"height\":4}"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = get_body_json(response).await;
    assert!(created["id"].is_number());

    let response = app
        .oneshot(get(&format!("/api/provenance?sessionId={}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let records = get_body_json(response).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["field_path"], "land_registry.gush");
    assert_eq!(records[0]["is_active"], true);
    assert_eq!(records[0]["bbox"]["width"], 3.0);
}

#[tokio::test]
async fn test_provenance_requires_session_id() {
    let (app, _db) = setup_test_app();

    let response = app.clone().oneshot(get("/api/provenance")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/provenance",
            json!({"field_path": "gush", "extraction_method": "manual"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Audit ==========

#[tokio::test]
async fn test_audit_log_records_requests() {
    let (app, db) = setup_test_app();
    let id = db.create_session(None).unwrap().id;

    app.clone()
        .oneshot(get(&format!("/api/session/{}", id)))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/audit?limit=10")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries = get_body_json(response).await;
    let entries = entries.as_array().unwrap();
    assert!(entries
        .iter()
        .any(|e| e["action"] == "get" && e["entity_id"] == id.as_str()));
    assert!(entries.iter().all(|e| e["user_email"] == "local-dev"));
}

// ========== Auth ==========

#[tokio::test]
async fn test_auth_required_without_key() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        api_keys: vec!["secret-key".to_string()],
        ..Default::default()
    };
    let app = create_router_with_extractor(db, None, config, None);

    let response = app.clone().oneshot(get("/api/sections")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sections")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sections")
                .header("authorization", "Bearer secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc".to_string(), "longer-key".to_string()];
    assert!(validate_api_key("abc", &keys));
    assert!(validate_api_key("longer-key", &keys));
    assert!(!validate_api_key("abd", &keys));
    assert!(!validate_api_key("", &keys));
}

#[test]
fn test_parse_trusted_networks() {
    let nets = parse_trusted_networks("192.168.1.0/24, 10.0.0.5,,garbage");
    assert_eq!(nets.len(), 2);

    let inside: std::net::IpAddr = "192.168.1.77".parse().unwrap();
    let single: std::net::IpAddr = "10.0.0.5".parse().unwrap();
    let outside: std::net::IpAddr = "10.0.0.6".parse().unwrap();
    assert!(is_ip_trusted(&inside, &nets));
    assert!(is_ip_trusted(&single, &nets));
    assert!(!is_ip_trusted(&outside, &nets));
}

fn forwarded_request(forwarded: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/sections");
    if let Some(value) = forwarded {
        builder = builder.header("x-forwarded-for", value);
    }
    builder.body(Body::empty()).unwrap()
}

fn peer(ip: &str) -> axum::extract::ConnectInfo<std::net::SocketAddr> {
    axum::extract::ConnectInfo(std::net::SocketAddr::new(ip.parse().unwrap(), 40000))
}

#[test]
fn test_client_ip_behind_proxies() {
    let proxies = parse_trusted_networks("10.0.0.1, 10.0.0.2");
    let ip = |s: &str| -> std::net::IpAddr { s.parse().unwrap() };

    // Direct peers are never overridden by the header
    let request = forwarded_request(Some("192.168.1.5"));
    assert_eq!(
        get_client_ip(&request, Some(&peer("203.0.113.9")), &proxies),
        Some(ip("203.0.113.9"))
    );

    // Right-most non-proxy hop wins; a forged left-most entry is ignored
    let request = forwarded_request(Some("192.168.1.5, 203.0.113.9, 10.0.0.2"));
    assert_eq!(
        get_client_ip(&request, Some(&peer("10.0.0.1")), &proxies),
        Some(ip("203.0.113.9"))
    );

    let request = forwarded_request(Some("198.51.100.7"));
    assert_eq!(
        get_client_ip(&request, Some(&peer("10.0.0.1")), &proxies),
        Some(ip("198.51.100.7"))
    );

    let request = forwarded_request(None);
    assert_eq!(
        get_client_ip(&request, Some(&peer("10.0.0.1")), &proxies),
        Some(ip("10.0.0.1"))
    );

    let request = forwarded_request(Some("192.168.1.5, not-an-ip"));
    assert_eq!(get_client_ip(&request, Some(&peer("10.0.0.1")), &proxies), None);

    assert_eq!(get_client_ip(&request, None, &proxies), None);
}

#[tokio::test]
async fn test_forged_forwarded_for_does_not_bypass_auth() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        api_keys: vec!["secret-key".to_string()],
        trusted_networks: parse_trusted_networks("192.168.1.0/24"),
        trusted_proxies: parse_trusted_networks("10.0.0.1"),
        ..Default::default()
    };
    let app = create_router_with_extractor(db, None, config, None);

    let mut forged = forwarded_request(Some("192.168.1.5, 203.0.113.9"));
    forged.extensions_mut().insert(peer("10.0.0.1"));
    let response = app.clone().oneshot(forged).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut trusted = forwarded_request(Some("192.168.1.5"));
    trusted.extensions_mut().insert(peer("10.0.0.1"));
    let response = app.oneshot(trusted).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_get_user_email() {
    let mut headers = axum::http::HeaderMap::new();
    assert_eq!(get_user_email(&headers), "local-dev");
    headers.insert("authorization", "Bearer k".parse().unwrap());
    assert_eq!(get_user_email(&headers), "api-key");
}
