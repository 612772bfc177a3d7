use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::lifecycle::{DeliveryStatus, OrderStatus};

/// What an anonymous holder of a tracking token may see. The internal
/// order id stays out of it.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingSummary {
    pub tracking_token: String,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub city: String,
    pub estimated_delivery: Option<NaiveDate>,
    pub tracking_notes: Option<String>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingItem {
    pub product_name: String,
    pub product_image: Option<String>,
    pub pack_size: Option<String>,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TrackingItemList {
    #[schema(value_type = Vec<TrackingItem>)]
    pub items: Vec<TrackingItem>,
}
