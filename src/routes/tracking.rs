use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::tracking::{TrackingItemList, TrackingSummary},
    error::AppResult,
    response::ApiResponse,
    services::tracking_service,
    state::AppState,
};

// No authentication: the token itself is the capability.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{token}", get(track_order))
        .route("/{token}/items", get(track_order_items))
}

#[utoipa::path(
    get,
    path = "/api/track/{token}",
    params(
        ("token" = String, Path, description = "Tracking token from the order confirmation")
    ),
    responses(
        (status = 200, description = "Order progress", body = ApiResponse<TrackingSummary>),
        (status = 404, description = "No order with this token"),
    ),
    tag = "Tracking"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<ApiResponse<TrackingSummary>>> {
    let resp = tracking_service::track_order(&state.pool, &token).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/track/{token}/items",
    params(
        ("token" = String, Path, description = "Tracking token from the order confirmation")
    ),
    responses(
        (status = 200, description = "Items of the tracked order", body = ApiResponse<TrackingItemList>),
        (status = 404, description = "No order with this token"),
    ),
    tag = "Tracking"
)]
pub async fn track_order_items(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<ApiResponse<TrackingItemList>>> {
    let resp = tracking_service::track_order_items(&state.pool, &token).await?;
    Ok(Json(resp))
}
