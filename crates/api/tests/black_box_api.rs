use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{StatusCode, header, redirect::Policy};
use serde_json::{Value, json};

use stocklink_api::config::AppConfig;
use stocklink_auth::{JwtClaims, Role};
use stocklink_core::UserId;

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let config = AppConfig {
            jwt_secret: Some(SECRET.to_string()),
            timezone_offset_minutes: 0,
            ..AppConfig::default()
        };
        let app = stocklink_api::app::build_app(&config).expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap();

        Self {
            base_url: format!("http://{addr}"),
            client,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(username: &str, roles: &[&'static str]) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        username: username.to_string(),
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()[header::LOCATION].to_str().unwrap()
}

async fn create_product(srv: &TestServer, sku: &str, name: &str) -> String {
    let admin = mint_jwt("root", &["admin"]);
    let res = srv
        .post(&admin, "/admin/products", json!({ "sku": sku, "name": name }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["product_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.get("not-a-token", "/whoami").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_branch_group() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt("ana", &["queimados"]);

    let res = srv.get(&token, "/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "ana");
    assert_eq!(body["branch"], "QUEIMADOS");
    assert_eq!(body["cart_count"], 0);
}

#[tokio::test]
async fn landing_and_wrong_branch_redirect() {
    let srv = TestServer::spawn().await;
    let requester = mint_jwt("ana", &["QUEIMADOS"]);
    let supplier = mint_jwt("bruno", &["AUSTIN"]);

    let res = srv.get(&requester, "/").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/queimados/products");

    let res = srv.get(&supplier, "/").await;
    assert_eq!(location(&res), "/austin/orders");

    let res = srv.get(&requester, "/austin/orders").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let res = srv.get(&supplier, "/queimados/cart").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = srv.get(&supplier, "/admin/products").await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn empty_cart_submit_is_rejected_with_redirect() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt("ana", &["QUEIMADOS"]);

    let res = srv.post(&token, "/queimados/cart/submit", json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "empty cart");
    assert_eq!(body["redirect"], "/queimados/cart");
}

#[tokio::test]
async fn transfer_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let ana = mint_jwt("ana", &["QUEIMADOS"]);
    let bruno = mint_jwt("bruno", &["AUSTIN"]);
    let product_id = create_product(&srv, "SKU1", "Arroz").await;

    // Cart: two adds merge into one line.
    for qty in [3, 2] {
        let res = srv
            .post(&ana, "/queimados/products", json!({ "product_id": product_id, "qty": qty }))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }
    let cart: Value = srv.get(&ana, "/queimados/cart").await.json().await.unwrap();
    assert_eq!(cart["status"], "DRAFT");
    assert_eq!(cart["count"], 1);
    assert_eq!(cart["lines"][0]["qty_requested"], 5);

    // Submit.
    let res = srv.post(&ana, "/queimados/cart/submit", json!({})).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    let id = order["order_id"].as_u64().unwrap();
    assert_eq!(order["status"], "SUBMITTED");

    let poll: Value = srv.get(&bruno, "/austin/api/poll").await.json().await.unwrap();
    assert_eq!(poll["count"], 1);
    assert_eq!(poll["newest_id"], id);

    // Supplier side.
    let res = srv.post(&bruno, &format!("/austin/orders/{id}/start-picking"), json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);
    let picking: Value = res.json().await.unwrap();
    assert_eq!(picking["picking_by"]["username"], "bruno");
    let item_id = picking["items"][0]["item_id"].as_u64().unwrap();

    let res = srv
        .post(
            &bruno,
            &format!("/austin/orders/{id}"),
            json!({ "quantities": { (item_id.to_string()): -5 }, "notes": "short on rice" }),
        )
        .await;
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["items"][0]["qty_sent"], 0);
    assert_eq!(updated["notes_from_austin"], "short on rice");

    let res = srv
        .post(&bruno, &format!("/austin/orders/{id}/items/{item_id}/ok"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // Confirming before dispatch is an invalid transition.
    let res = srv.post(&ana, &format!("/queimados/orders/{id}/receive"), json!({})).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv.post(&bruno, &format!("/austin/orders/{id}/dispatch"), json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Only the creator may confirm.
    let carla = mint_jwt("carla", &["QUEIMADOS"]);
    let res = srv.post(&carla, &format!("/queimados/orders/{id}/receive"), json!({})).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.post(&ana, &format!("/queimados/orders/{id}/receive"), json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);

    let detail: Value = srv.get(&ana, &format!("/queimados/orders/{id}")).await.json().await.unwrap();
    assert_eq!(detail["status"], "RECEIVED");
    let actions: Vec<&str> = detail["log"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["confirmed receipt", "dispatched", "marked OK for Arroz", "started picking", "submitted"]
    );

    let status: Value = srv.get(&carla, &format!("/orders/{id}/poll")).await.json().await.unwrap();
    assert_eq!(status["status"], "RECEIVED");
}

#[tokio::test]
async fn reports_start_blank_but_export_everything() {
    let srv = TestServer::spawn().await;
    let ana = mint_jwt("ana", &["QUEIMADOS"]);
    let bruno = mint_jwt("bruno", &["AUSTIN"]);
    let product_id = create_product(&srv, "SKU1", "Arroz").await;

    srv.post(&ana, "/queimados/products", json!({ "product_id": product_id, "qty": 1 }))
        .await;
    let res = srv.post(&ana, "/queimados/cart/submit", json!({})).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let blank: Value = srv.get(&bruno, "/austin/report").await.json().await.unwrap();
    assert_eq!(blank, json!([]));

    let today = Utc::now().date_naive().to_string();
    let ranged: Value = srv
        .get(&bruno, &format!("/austin/report?start={today}&end={today}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ranged.as_array().unwrap().len(), 1);

    let res = srv.get(&bruno, "/austin/report/pdf?start=&end=").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report_austin.pdf\""
    );
    let bytes = res.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let res = srv.get(&ana, "/queimados/report/pdf/1").await;
    assert_eq!(
        res.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"order_queimados_1.pdf\""
    );

    let res = srv.get(&ana, "/queimados/report/pdf/99").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
