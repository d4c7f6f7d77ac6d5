use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use grn_api::{build_router, AppState, Claims, JwtState, Role, ShareSettings};
use grn_core::open_db_in_memory;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret-with-enough-bytes";

fn app() -> Router {
    let conn = open_db_in_memory().unwrap();
    let share = ShareSettings {
        default_country_code: Some("94".to_string()),
    };
    build_router(AppState::new(conn, JwtState::from_secret(SECRET, 0), share))
}

fn token(role: Role, shop_id: Option<Uuid>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let claims = Claims {
        sub: format!("user-{}", role.as_str()),
        name: "Test User".to_string(),
        shop_id,
        role,
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn error_code(body: &Value) -> &str {
    assert_eq!(body["success"], json!(false));
    body["error"]["code"].as_str().unwrap()
}

struct Fixture {
    app: Router,
    shop_id: Uuid,
    super_admin: String,
    admin: String,
    manager: String,
    staff: String,
}

async fn fixture() -> Fixture {
    let app = app();
    let super_admin = token(Role::SuperAdmin, None);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/shops",
        Some(&super_admin),
        Some(json!({ "name": "Colombo Computers" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let shop_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    Fixture {
        app,
        shop_id,
        super_admin,
        admin: token(Role::Admin, Some(shop_id)),
        manager: token(Role::Manager, Some(shop_id)),
        staff: token(Role::Staff, Some(shop_id)),
    }
}

impl Fixture {
    async fn create_supplier(&self, name: &str, phone: Option<&str>) -> Uuid {
        let (status, body) = send(
            &self.app,
            Method::POST,
            &format!("/api/v1/shops/{}/suppliers", self.shop_id),
            Some(&self.manager),
            Some(json!({ "name": name, "phone": phone })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    async fn create_grn(&self, supplier_id: Uuid, received_qty: i64, unit_cost_cents: i64) -> Value {
        let (status, body) = send(
            &self.app,
            Method::POST,
            "/api/v1/grns",
            Some(&self.manager),
            Some(json!({
                "supplier_id": supplier_id,
                "invoice_number": "INV-100",
                "items": [{
                    "product_name": "SSD 1TB",
                    "ordered_qty": received_qty,
                    "received_qty": received_qty,
                    "unit_cost_cents": unit_cost_cents,
                }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

#[tokio::test]
async fn health_and_version_are_public() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));

    let (status, body) = send(&app, Method::GET, "/version", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("grn-server"));
}

#[tokio::test]
async fn api_requires_a_valid_bearer_token() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/shops", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");

    let (status, body) = send(&app, Method::GET, "/api/v1/shops", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn only_super_admins_create_shops() {
    let f = fixture().await;
    let (status, body) = send(
        &f.app,
        Method::POST,
        "/api/v1/shops",
        Some(&f.admin),
        Some(json!({ "name": "Kandy Branch" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PERMISSION_DENIED");

    let (status, body) = send(&f.app, Method::GET, "/api/v1/shops", Some(&f.staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&f.app, Method::GET, "/api/v1/shops", Some(&f.super_admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], json!(f.shop_id));
}

#[tokio::test]
async fn sections_get_put_and_patch() {
    let f = fixture().await;
    let uri = format!("/api/v1/shops/{}/sections", f.shop_id);

    let (status, body) = send(&f.app, Method::GET, &uri, Some(&f.staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sections"]["grn"], json!(true));

    let (status, body) = send(
        &f.app,
        Method::PATCH,
        &uri,
        Some(&f.admin),
        Some(json!({ "sales": false, "reports": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sections"]["sales"], json!(false));
    assert_eq!(body["data"]["sections"]["grn"], json!(true));

    let (status, body) = send(
        &f.app,
        Method::PATCH,
        &uri,
        Some(&f.admin),
        Some(json!({ "warehouse": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");

    let (status, body) = send(
        &f.app,
        Method::PUT,
        &uri,
        Some(&f.admin),
        Some(json!({ "sales": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");

    let (status, _) = send(
        &f.app,
        Method::PATCH,
        &uri,
        Some(&f.manager),
        Some(json!({ "sales": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn staff_cannot_write_and_other_shops_are_hidden() {
    let f = fixture().await;
    let (status, body) = send(
        &f.app,
        Method::POST,
        &format!("/api/v1/shops/{}/suppliers", f.shop_id),
        Some(&f.staff),
        Some(json!({ "name": "Tech Distributors" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PERMISSION_DENIED");

    let outsider = token(Role::Admin, Some(Uuid::new_v4()));
    let (status, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/shops/{}/suppliers", f.shop_id),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PERMISSION_DENIED");

    let supplier_id = f.create_supplier("Tech Distributors", None).await;
    let grn = f.create_grn(supplier_id, 2, 10_000).await;
    let grn_id = grn["id"].as_str().unwrap();
    let (status, _) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{grn_id}"),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn grn_create_list_and_paginate() {
    let f = fixture().await;
    let supplier_id = f.create_supplier("Tech Distributors", None).await;

    let first = f.create_grn(supplier_id, 5, 12_500).await;
    assert_eq!(first["grn_number"], json!("GRN-00001"));
    assert_eq!(first["total_cents"], json!(62_500));
    assert_eq!(first["payment_status"], json!("unpaid"));
    assert_eq!(first["status"], json!("received"));

    for _ in 0..2 {
        f.create_grn(supplier_id, 1, 1_000).await;
    }

    let (status, body) = send(
        &f.app,
        Method::GET,
        "/api/v1/grns?page=1&page_size=2",
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(3));
    assert_eq!(body["data"]["total_pages"], json!(2));
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &f.app,
        Method::GET,
        "/api/v1/grns?search=tech&status=received",
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(3));

    let (status, body) = send(
        &f.app,
        Method::GET,
        "/api/v1/grns?status=lost",
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");

    let (status, body) = send(&f.app, Method::GET, "/api/v1/grns", Some(&f.super_admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");

    let (status, body) = send(
        &f.app,
        Method::GET,
        "/api/v1/grns/summary",
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["grn_count"], json!(3));
    assert_eq!(body["data"]["total_cents"], json!(64_500));
}

#[tokio::test]
async fn grn_rejects_unknown_supplier() {
    let f = fixture().await;
    let (status, body) = send(
        &f.app,
        Method::POST,
        "/api/v1/grns",
        Some(&f.manager),
        Some(json!({
            "supplier_id": Uuid::new_v4(),
            "items": [{ "product_name": "RAM", "received_qty": 1, "unit_cost_cents": 100 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");
}

#[tokio::test]
async fn status_changes_follow_the_lifecycle() {
    let f = fixture().await;
    let supplier_id = f.create_supplier("Tech Distributors", None).await;
    let grn = f.create_grn(supplier_id, 1, 5_000).await;
    let uri = format!("/api/v1/grns/{}/status", grn["id"].as_str().unwrap());

    let (status, body) = send(
        &f.app,
        Method::PATCH,
        &uri,
        Some(&f.manager),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("completed"));

    let (status, body) = send(
        &f.app,
        Method::PATCH,
        &uri,
        Some(&f.manager),
        Some(json!({ "status": "draft" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
}

#[tokio::test]
async fn payments_update_grn_settlement() {
    let f = fixture().await;
    let supplier_id = f.create_supplier("Tech Distributors", None).await;
    let grn = f.create_grn(supplier_id, 2, 10_000).await;
    let grn_id = grn["id"].as_str().unwrap().to_string();
    let payments_uri = format!("/api/v1/shops/{}/payments", f.shop_id);

    let (status, body) = send(
        &f.app,
        Method::POST,
        &payments_uri,
        Some(&f.manager),
        Some(json!({
            "supplier_id": supplier_id,
            "grn_id": grn_id,
            "amount_cents": 5_000,
            "method": "cash",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let payment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{grn_id}"),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(body["data"]["paid_cents"], json!(5_000));
    assert_eq!(body["data"]["payment_status"], json!("partial"));

    let (status, body) = send(
        &f.app,
        Method::POST,
        &payments_uri,
        Some(&f.manager),
        Some(json!({
            "supplier_id": supplier_id,
            "grn_id": grn_id,
            "amount_cents": 50_000,
            "method": "bank_transfer",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let (status, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/shops/{}/suppliers/{supplier_id}/balance", f.shop_id),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outstanding_cents"], json!(15_000));

    let (status, body) = send(
        &f.app,
        Method::DELETE,
        &format!("/api/v1/grns/{grn_id}"),
        Some(&f.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let (status, body) = send(
        &f.app,
        Method::DELETE,
        &format!("{payments_uri}/{payment_id}"),
        Some(&f.admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], json!(true));

    let (_, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{grn_id}"),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(body["data"]["payment_status"], json!("unpaid"));
}

#[tokio::test]
async fn share_builds_whatsapp_link_from_supplier_phone() {
    let f = fixture().await;
    let supplier_id = f.create_supplier("Tech Distributors", Some("077 123 4567")).await;
    let grn = f.create_grn(supplier_id, 1, 2_500).await;
    let grn_id = grn["id"].as_str().unwrap();

    let (status, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{grn_id}/share"),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["data"]["whatsapp_url"].as_str().unwrap();
    assert!(url.starts_with("https://wa.me/94771234567?text="));
    assert!(body["data"]["message"]
        .as_str()
        .unwrap()
        .contains("GRN-00001"));

    let (status, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{grn_id}/share?phone=%2B14155550100"),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["whatsapp_url"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/14155550100?"));
}

#[tokio::test]
async fn share_without_any_phone_is_rejected() {
    let f = fixture().await;
    let supplier_id = f.create_supplier("Tech Distributors", None).await;
    let grn = f.create_grn(supplier_id, 1, 2_500).await;
    let (status, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{}/share", grn["id"].as_str().unwrap()),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");
}

#[tokio::test]
async fn unknown_records_and_bad_ids_use_the_error_envelope() {
    let f = fixture().await;
    let (status, body) = send(
        &f.app,
        Method::GET,
        &format!("/api/v1/grns/{}", Uuid::new_v4()),
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    let (status, body) = send(
        &f.app,
        Method::GET,
        "/api/v1/grns/not-a-uuid",
        Some(&f.staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");

    let (status, body) = send(
        &f.app,
        Method::POST,
        &format!("/api/v1/shops/{}/categories", f.shop_id),
        Some(&f.manager),
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_FAILED");
}
