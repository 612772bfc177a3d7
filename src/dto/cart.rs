use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    cart::{Cart, CartLine},
    pricing::CheckoutQuote,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: String,
    /// Bulk pack label; omit for the single item.
    pub pack_size: Option<String>,
    /// Defaults to 1.
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    /// Zero or below removes the line.
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteQuery {
    pub coupon: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_items: i64,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let total_items = cart.total_items();
        let total_price = cart.total_price();
        Self {
            items: cart.into_lines(),
            total_items,
            total_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartQuote {
    pub cart: CartView,
    pub quote: CheckoutQuote,
}
