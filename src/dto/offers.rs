use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::pricing::DiscountType, models::Offer};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOfferRequest {
    pub code: String,
    pub title: String,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOfferRequest {
    pub title: Option<String>,
    pub discount_type: Option<DiscountType>,
    #[schema(value_type = Option<String>)]
    pub discount_value: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub min_order_amount: Option<Decimal>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OfferList {
    #[schema(value_type = Vec<Offer>)]
    pub items: Vec<Offer>,
}
