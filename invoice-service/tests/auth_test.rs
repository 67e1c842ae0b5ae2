mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{bootstrap_admin, test_config, TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_returns_token_and_sanitized_user() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "name": "Ada",
                "email": "Ada@Example.com",
                "password": PASSWORD,
                "company": "Engines Ltd"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["company"], "Engines Ltd");
    assert_eq!(body["user"]["isAdmin"], false);
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "ADA@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let app = TestApp::new().await;

    let short_password = json!({ "name": "Ada", "email": "ada@example.com", "password": "123" });
    let bad_email = json!({ "name": "Ada", "email": "not-an-email", "password": PASSWORD });

    for body in [short_password, bad_email] {
        let (status, _) = app
            .request(Method::POST, "/auth/register", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn login_succeeds_with_correct_password() {
    let app = TestApp::new().await;
    let user = app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["_id"], user.id.as_str());
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let app = TestApp::new().await;
    app.register("Ada", "ada@example.com").await;

    let (wrong_password, wrong_password_body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        )
        .await;
    let (unknown_email, unknown_email_body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password_body["message"], "Invalid email or password");
    assert_eq!(wrong_password_body, unknown_email_body);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await;

    for uri in ["/auth/profile", "/invoices", "/invoices/stats", "/admin/users"] {
        let (status, body) = app.request(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["message"], "Not authorized, no token");
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::GET, "/auth/profile", Some("not.a.jwt"), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token failed");
}

#[tokio::test]
async fn token_for_deleted_user_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.register("Admin", "admin@example.com").await;
    app.make_admin(&admin.id).await;
    let user = app.register("Ada", "ada@example.com").await;

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/admin/users/{}", user.id),
            Some(&admin.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::GET, "/auth/profile", Some(&user.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_bearer_authorization_header_counts_as_missing() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/auth/profile")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_can_be_read_and_updated() {
    let app = TestApp::new().await;
    let user = app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .request(Method::GET, "/auth/profile", Some(&user.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada");

    let (status, body) = app
        .request(
            Method::PUT,
            "/auth/profile",
            Some(&user.token),
            Some(json!({ "name": "Ada Lovelace", "phone": "555-0100", "password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Ada Lovelace");
    assert_eq!(body["user"]["phone"], "555-0100");

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_cannot_grant_admin() {
    let app = TestApp::new().await;
    let user = app.register("Ada", "ada@example.com").await;

    let (status, _) = app
        .request(
            Method::PUT,
            "/auth/profile",
            Some(&user.token),
            Some(json!({ "isAdmin": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .request(Method::GET, "/auth/profile", Some(&user.token), None)
        .await;
    assert_eq!(body["user"]["isAdmin"], false);
}

#[tokio::test]
async fn profile_email_change_respects_uniqueness() {
    let app = TestApp::new().await;
    app.register("Ada", "ada@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;

    let (status, body) = app
        .request(
            Method::PUT,
            "/auth/profile",
            Some(&bob.token),
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already in use");
}

#[tokio::test]
async fn auth_endpoints_are_rate_limited_per_ip() {
    let mut config = test_config();
    config.rate_limit.auth_attempts = 2;
    let app = TestApp::with_config(config).await;

    let login = || {
        Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header("x-forwarded-for", "203.0.113.7")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": "ada@example.com", "password": PASSWORD }).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(app.send(login()).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(app.send(login()).await.0, StatusCode::UNAUTHORIZED);
    let (status, headers, _) = app.send(login()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn bootstrap_admin_can_log_in_with_admin_role() {
    let mut config = test_config();
    config.bootstrap_admin = Some(bootstrap_admin());
    let app = TestApp::with_config(config).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "root@example.com", "password": "root-password" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isAdmin"], true);
}

#[test]
fn config_debug_output_hides_secrets() {
    let mut config = test_config();
    config.bootstrap_admin = Some(bootstrap_admin());

    let rendered = format!("{:?}", config);

    assert!(!rendered.contains("integration-test-secret"));
    assert!(!rendered.contains("root-password"));
    assert!(rendered.contains("root@example.com"));
}
