//! Anonymous order lookup. The tracking token is the only credential: it
//! reads exactly one order and never mutates anything.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    domain::lifecycle::{DeliveryStatus, OrderStatus},
    dto::tracking::{TrackingItem, TrackingItemList, TrackingSummary},
    error::{AppError, AppResult},
    response::ApiResponse,
};

#[derive(FromRow)]
struct TrackingRow {
    tracking_token: String,
    status: String,
    delivery_status: String,
    city: Option<String>,
    estimated_delivery: Option<NaiveDate>,
    tracking_notes: Option<String>,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct TrackingItemRow {
    product_name: String,
    product_image: Option<String>,
    pack_size: Option<String>,
    quantity: i32,
    price: Decimal,
}

fn normalize_token(token: &str) -> AppResult<&str> {
    let token = token.trim();
    if token.is_empty() || token.len() > 64 {
        return Err(AppError::NotFound);
    }
    Ok(token)
}

pub async fn track_order(pool: &DbPool, token: &str) -> AppResult<ApiResponse<TrackingSummary>> {
    let token = normalize_token(token)?;
    let row = sqlx::query_as::<_, TrackingRow>(
        r#"
        SELECT tracking_token, status, delivery_status,
               shipping_address ->> 'city' AS city,
               estimated_delivery, tracking_notes, total_amount, created_at
        FROM orders
        WHERE tracking_token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let summary = TrackingSummary {
        tracking_token: row.tracking_token,
        status: row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?,
        delivery_status: row
            .delivery_status
            .parse::<DeliveryStatus>()
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?,
        city: row.city.unwrap_or_default(),
        estimated_delivery: row.estimated_delivery,
        tracking_notes: row.tracking_notes,
        total_amount: row.total_amount,
        created_at: row.created_at,
    };

    Ok(ApiResponse::ok("Order found", summary))
}

pub async fn track_order_items(
    pool: &DbPool,
    token: &str,
) -> AppResult<ApiResponse<TrackingItemList>> {
    let token = normalize_token(token)?;

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE tracking_token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    let (order_id,) = exists.ok_or(AppError::NotFound)?;

    let items = sqlx::query_as::<_, TrackingItemRow>(
        r#"
        SELECT product_name, product_image, pack_size, quantity, price
        FROM order_items
        WHERE order_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| TrackingItem {
        product_name: row.product_name,
        product_image: row.product_image,
        pack_size: row.pack_size,
        quantity: row.quantity,
        price: row.price,
    })
    .collect();

    Ok(ApiResponse::ok("OK", TrackingItemList { items }))
}
