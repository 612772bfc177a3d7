use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::{
        checkout::ShippingAddress,
        handoff::WhatsappHandoff,
        lifecycle::{DeliveryStatus, OrderStatus},
    },
    models::{Order, OrderItem},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub whatsapp: WhatsappHandoff,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeliveryRequest {
    pub delivery_status: DeliveryStatus,
    pub tracking_notes: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualOrderLine {
    pub product_id: String,
    pub pack_size: Option<String>,
    pub quantity: i32,
}

/// Order taken over WhatsApp and entered by staff.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualOrderRequest {
    pub items: Vec<ManualOrderLine>,
    pub shipping_address: ShippingAddress,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}
