//! The page controller talking to the real router over HTTP.

use chrono::{Duration as ChronoDuration, Utc};
use flowgic_api::ApiConfig;
use flowgic_auth::{JwtClaims, Role};
use flowgic_client::{
    ClientConfig, HttpTransport, OrderPage, OrderUpdateController, Tone, UpdateOutcome,
};
use flowgic_core::{CompanyId, UserId};
use flowgic_logistics::OrderStatus;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

const JWT_SECRET: &str = "e2e-secret";

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let app = flowgic_api::app::build_app(&ApiConfig::new(JWT_SECRET)).expect("failed to build app");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

fn mint_jwt(role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        company_id: CompanyId::new(),
        roles: vec![role],
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Create an order and load its detail page the way a browser would.
async fn open_order_page(base_url: &str, token: &str) -> OrderPage {
    let http = reqwest::Client::new();

    let csrf: Value = http
        .get(format!("{base_url}/csrf/"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let created: Value = http
        .post(format!("{base_url}/requests/"))
        .bearer_auth(token)
        .header("X-CSRFToken", csrf["csrf_token"].as_str().unwrap())
        .json(&json!({
            "cargo_type": "Steel coils",
            "cargo_mass_kg": 18000,
            "origin": "Karaganda",
            "destination": "Pavlodar",
            "agreed_price": "500",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let resource_path = format!("/requests/{}/", created["id"].as_str().unwrap());

    let detail: Value = http
        .get(format!("{base_url}{resource_path}"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let status = OrderStatus::from_code(detail["status"].as_str().unwrap()).unwrap();
    OrderPage::new(resource_path, detail["csrf_token"].as_str().unwrap(), status)
}

#[tokio::test]
async fn controller_round_trips_status_and_financials() {
    let (base_url, server) = spawn_server().await;
    let token = mint_jwt(Role::DISPATCHER);
    let page = open_order_page(&base_url, &token).await;
    assert_eq!(page.badge.text, "Created");

    let config = ClientConfig {
        base_url: base_url.clone(),
        bearer_token: Some(token),
        ..ClientConfig::default()
    };
    let mut ctl = OrderUpdateController::new(HttpTransport::from_config(&config), page, &config);

    assert_eq!(ctl.select_status("completed").await, UpdateOutcome::Applied);
    assert_eq!(ctl.page().badge.text, "Completed");
    assert_eq!(ctl.page().badge.class, "status-completed");
    assert_eq!(ctl.page().select.value, "");

    // Same status again: the server's 400 body reaches the banner.
    assert_eq!(
        ctl.select_status("completed").await,
        UpdateOutcome::Rejected("Status unchanged".into())
    );
    assert_eq!(ctl.banner().snapshot().tone, Tone::Error);
    assert_eq!(ctl.page().badge.text, "Completed");

    ctl.page_mut().form.fuel_expenses = "100".into();
    ctl.page_mut().form.driver_cost = "50".into();
    assert_eq!(ctl.submit_financials().await, UpdateOutcome::Applied);
    assert_eq!(ctl.page().profit.text, "350.00");
    assert_eq!(ctl.banner().snapshot().text, "Financial data saved");

    ctl.page_mut().form.fuel_expenses = "-1".into();
    assert_eq!(
        ctl.submit_financials().await,
        UpdateOutcome::Rejected("fuel_expenses must not be negative".into())
    );
    assert_eq!(ctl.page().profit.text, "350.00");

    server.abort();
}

#[tokio::test]
async fn controller_surfaces_permission_and_network_failures() {
    let (base_url, server) = spawn_server().await;
    let dispatcher = mint_jwt(Role::DISPATCHER);
    let page = open_order_page(&base_url, &dispatcher).await;

    // A driver token: the server answers 403 with the JSON failure body.
    let config = ClientConfig {
        base_url: base_url.clone(),
        bearer_token: Some(mint_jwt(Role::DRIVER)),
        ..ClientConfig::default()
    };
    let mut ctl = OrderUpdateController::new(HttpTransport::from_config(&config), page.clone(), &config);
    assert_eq!(
        ctl.select_status("loading").await,
        UpdateOutcome::Rejected("Permission denied".into())
    );

    // No token at all: bare 401 without a JSON body.
    let config = ClientConfig {
        base_url: base_url.clone(),
        ..ClientConfig::default()
    };
    let mut ctl = OrderUpdateController::new(HttpTransport::from_config(&config), page, &config);
    assert_eq!(ctl.select_status("loading").await, UpdateOutcome::NetworkError);
    assert_eq!(ctl.page().badge.text, "Created");

    server.abort();
}
