use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        offers::{CreateOfferRequest, OfferList, UpdateOfferRequest},
        orders::{
            ManualOrderRequest, OrderList, OrderWithItems, UpdateDeliveryRequest,
            UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Offer, Order, Product},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{admin_service, offer_service, product_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders).post(create_manual_order))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/delivery", patch(update_delivery_status))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/products", post(create_product))
        .route(
            "/products/{id}",
            put(update_product).delete(delete_product),
        )
        .route("/offers", get(list_offers).post(create_offer))
        .route("/offers/{id}", put(update_offer).delete(delete_offer))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("delivery_status" = Option<String>, Query, description = "Filter by delivery status"),
        ("order_source" = Option<String>, Query, description = "website or whatsapp"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders",
    request_body = ManualOrderRequest,
    responses(
        (status = 200, description = "Order entered on behalf of a WhatsApp customer", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Bad Request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_manual_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ManualOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::create_manual_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Get order detail (admin only)", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/delivery",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateDeliveryRequest,
    responses(
        (status = 200, description = "Delivery status advanced", body = ApiResponse<Order>),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::update_delivery_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Bad Request"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(
        ("id" = String, Path, description = "Product slug")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(
        ("id" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 400, description = "Product is referenced by orders"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/offers",
    responses(
        (status = 200, description = "All offers", body = ApiResponse<OfferList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_offers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OfferList>>> {
    let resp = offer_service::list_offers(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/offers",
    request_body = CreateOfferRequest,
    responses(
        (status = 200, description = "Offer created", body = ApiResponse<Offer>),
        (status = 400, description = "Invalid terms or duplicate code"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOfferRequest>,
) -> AppResult<Json<ApiResponse<Offer>>> {
    let resp = offer_service::create_offer(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/offers/{id}",
    params(
        ("id" = Uuid, Path, description = "Offer ID")
    ),
    request_body = UpdateOfferRequest,
    responses(
        (status = 200, description = "Offer updated", body = ApiResponse<Offer>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Offer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOfferRequest>,
) -> AppResult<Json<ApiResponse<Offer>>> {
    let resp = offer_service::update_offer(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/offers/{id}",
    params(
        ("id" = Uuid, Path, description = "Offer ID")
    ),
    responses(
        (status = 200, description = "Offer deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Offer not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_offer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = offer_service::delete_offer(&state, &user, id).await?;
    Ok(Json(resp))
}
