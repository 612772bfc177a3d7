use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use sqlx::postgres::PgPoolOptions;
use storefront_api::{
    config::StoreSettings,
    routes::{create_app, health::health_check},
    state::AppState,
};
use testresult::TestResult;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.service, "storefront-api");
}

// The pool never connects: these requests are answered before any query runs.
fn offline_app() -> TestResult<Router> {
    let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/unused")?;
    let state = AppState::new(pool, StoreSettings::default(), "test-secret");
    Ok(create_app(state))
}

#[tokio::test]
async fn health_route_serves_json_with_request_id() -> TestResult {
    let response = offline_app()?
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_path_gets_enveloped_404() -> TestResult {
    let response = offline_app()?
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["data"]["path"], "/api/nope");
    Ok(())
}

#[tokio::test]
async fn cart_requires_bearer_token() -> TestResult {
    let app = offline_app()?;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/cart").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/orders")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn oversized_tracking_token_is_not_found() -> TestResult {
    let app = offline_app()?;
    let token = "a".repeat(80);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/track/{token}"))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
