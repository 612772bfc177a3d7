use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    catalog::{BulkPack, ProductType},
    checkout::{OrderSource, ShippingAddress},
    lifecycle::{DeliveryStatus, OrderStatus},
    pricing::DiscountType,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Human-assigned slug, e.g. `mango-milk`.
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "549")]
    pub price: Decimal,
    pub category: String,
    pub product_type: ProductType,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub bulk_packs: Vec<BulkPack>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub tracking_token: String,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount_amount: Decimal,
    #[schema(value_type = String)]
    pub shipping_fee: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub coupon_code: Option<String>,
    pub payment_method: String,
    pub order_source: OrderSource,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub shipping_address: ShippingAddress,
    pub estimated_delivery: Option<NaiveDate>,
    pub tracking_notes: Option<String>,
    pub customer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub pack_size: Option<String>,
    pub quantity: i32,
    /// Unit price at the time the order was placed.
    #[schema(value_type = String)]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Offer {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    #[schema(value_type = String)]
    pub min_order_amount: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
