//! Test helpers driving the full router against the in-memory store.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use invoice_service::{
    build_router,
    config::{
        BootstrapAdminConfig, Environment, InvoiceConfig, JwtConfig, MongoConfig, RateLimitConfig,
        SecurityConfig, StoreBackend,
    },
    services::{MemoryStore, UserStore},
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "secret123";

pub fn test_config() -> InvoiceConfig {
    InvoiceConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "invoice-service-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        store: StoreBackend::Memory,
        mongodb: MongoConfig {
            uri: "mongodb://unused".to_string(),
            database: "unused".to_string(),
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret".to_string()),
            expiry_days: 30,
        },
        security: SecurityConfig {
            allowed_origins: vec!["*".to_string()],
        },
        rate_limit: RateLimitConfig {
            auth_attempts: 1000,
            auth_window_seconds: 60,
        },
        bootstrap_admin: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// A registered account as seen by the tests.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: InvoiceConfig) -> Self {
        let bootstrap = config.bootstrap_admin.clone();
        let state = AppState::new(config, Arc::new(MemoryStore::new()))
            .expect("Failed to build application state");
        if let Some(admin) = bootstrap {
            state
                .auth_service
                .ensure_admin(&admin)
                .await
                .expect("Failed to bootstrap admin");
        }
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to respond");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, headers, body)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let (status, _, bytes) = self.send(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn register(&self, name: &str, email: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        TestUser {
            id: body["user"]["_id"].as_str().unwrap().to_string(),
            email: body["user"]["email"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Flip the admin flag directly in the store.
    pub async fn make_admin(&self, user_id: &str) {
        let store = &self.state.store;
        let mut user = store.find_user(user_id).await.unwrap().unwrap();
        user.is_admin = true;
        store.replace_user(&user).await.unwrap();
    }

    pub async fn create_invoice(&self, token: &str, body: Value) -> Value {
        let (status, invoice) = self
            .request(Method::POST, "/invoices", Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {invoice}");
        invoice
    }
}

pub fn bootstrap_admin() -> BootstrapAdminConfig {
    BootstrapAdminConfig {
        email: "root@example.com".to_string(),
        password: Secret::new("root-password".to_string()),
        name: "Root".to_string(),
    }
}

/// Invoice with a single line item so `total == rate` when tax and discount are zero.
pub fn invoice_body(client: &str, status: &str, rate: f64) -> Value {
    json!({
        "clientName": client,
        "clientEmail": "billing@client.test",
        "items": [{ "description": "Services", "quantity": 1, "rate": rate }],
        "dueDate": "2025-06-30",
        "status": status
    })
}
