use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use login_server::{
    credentials::{InMemoryCredentialStore, SecretDigest, UserRecord},
    routes,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn app() -> Router {
    let store = InMemoryCredentialStore::from_records([UserRecord {
        email: "alice@example.com".into(),
        password_sha256: SecretDigest::of("correct horse").to_hex(),
    }])
    .expect("valid records");
    routes::router(Arc::new(store))
}

async fn post_login(app: Router, body: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?;

    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn correct_password_logs_in() -> Result<()> {
    let (status, body) = post_login(
        app(),
        json!({ "email": "alice@example.com", "password": "correct horse" }),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Login successful" }));
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let (status, body) = post_login(
        app(),
        json!({ "email": "alice@example.com", "password": "battery staple" }),
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid password" }));
    Ok(())
}

#[tokio::test]
async fn unknown_user_is_not_found() -> Result<()> {
    let (status, body) = post_login(
        app(),
        json!({ "email": "mallory@example.com", "password": "correct horse" }),
    )
    .await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "User not found" }));
    Ok(())
}

#[tokio::test]
async fn missing_or_empty_fields_are_bad_requests() -> Result<()> {
    for body in [
        json!({ "email": "alice@example.com" }),
        json!({ "password": "correct horse" }),
        json!({ "email": "", "password": "correct horse" }),
        json!({}),
    ] {
        let (status, response) = post_login(app(), body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response,
            json!({ "error": "Email and password are required" })
        );
    }
    Ok(())
}

#[tokio::test]
async fn unreadable_bodies_are_bad_requests() -> Result<()> {
    for (content_type, body) in [
        (Some("application/json"), "not json"),
        (Some("application/json"), "[1, 2, 3]"),
        (Some("text/plain"), r#"{"email":"alice@example.com","password":"correct horse"}"#),
        (None, r#"{"email":"alice@example.com","password":"correct horse"}"#),
    ] {
        let mut request = Request::builder().method("POST").uri("/api/login");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let response = app().oneshot(request.body(Body::from(body))?).await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let response: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(
            response,
            json!({ "error": "Email and password are required" })
        );
    }
    Ok(())
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "alice@example.com", "password": "correct horse" }).to_string(),
        ))?;

    let response = app().oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&header::HeaderValue::from_static("*"))
    );
    Ok(())
}

#[tokio::test]
async fn serves_users_loaded_from_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("users.json");
    let users = json!({
        "users": [
            { "email": "bob@example.com", "password_sha256": SecretDigest::of("pw").to_hex() }
        ]
    });
    tokio::fs::write(&path, users.to_string()).await?;

    let store = InMemoryCredentialStore::load(&path).await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, routes::router(Arc::new(store))).await;
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/login"))
        .json(&json!({ "email": "bob@example.com", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Login successful");

    server.abort();
    Ok(())
}
