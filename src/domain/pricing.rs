use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::Offer;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("coupon {0} is not valid")]
    UnknownCoupon(String),

    #[error("coupon {0} is not active")]
    InactiveCoupon(String),

    #[error("coupon {0} is not valid yet")]
    NotStarted(String),

    #[error("coupon {0} has expired")]
    Expired(String),

    #[error("coupon {code} needs a minimum order of {min}")]
    BelowMinimum { code: String, min: Decimal },

    #[error("unknown discount type {0}")]
    UnknownDiscountType(String),

    #[error("{0}")]
    InvalidOffer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    FreeShipping,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
            DiscountType::FreeShipping => "free_shipping",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            "free_shipping" => Ok(DiscountType::FreeShipping),
            other => Err(PricingError::UnknownDiscountType(other.to_string())),
        }
    }
}

/// Flat delivery fee, waived once the subtotal reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingPolicy {
    pub flat_fee: Decimal,
    pub free_threshold: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Decimal::from(50),
            free_threshold: Decimal::from(999),
        }
    }
}

impl ShippingPolicy {
    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.flat_fee
        }
    }
}

/// What an accepted coupon does to the order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiscountEffect {
    Amount(Decimal),
    WaiveShipping,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Checks an offer's stored values before it is saved.
pub fn validate_offer_terms(
    discount_type: DiscountType,
    value: Decimal,
    min_order_amount: Decimal,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), PricingError> {
    if value < Decimal::ZERO || min_order_amount < Decimal::ZERO {
        return Err(PricingError::InvalidOffer(
            "discount value and minimum order must not be negative".into(),
        ));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(PricingError::InvalidOffer(
            "percentage discount cannot exceed 100".into(),
        ));
    }
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if end <= start {
            return Err(PricingError::InvalidOffer(
                "offer must end after it starts".into(),
            ));
        }
    }
    Ok(())
}

impl Offer {
    /// Validates the offer against the current subtotal and time and returns
    /// its effect.
    pub fn evaluate(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<DiscountEffect, PricingError> {
        if !self.is_active {
            return Err(PricingError::InactiveCoupon(self.code.clone()));
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(PricingError::NotStarted(self.code.clone()));
        }
        if self.ends_at.is_some_and(|end| now > end) {
            return Err(PricingError::Expired(self.code.clone()));
        }
        if subtotal < self.min_order_amount {
            return Err(PricingError::BelowMinimum {
                code: self.code.clone(),
                min: self.min_order_amount,
            });
        }

        let effect = match self.discount_type {
            DiscountType::Percentage => DiscountEffect::Amount(round_money(
                subtotal * self.discount_value / Decimal::ONE_HUNDRED,
            )),
            DiscountType::Fixed => DiscountEffect::Amount(self.discount_value.min(subtotal)),
            DiscountType::FreeShipping => DiscountEffect::WaiveShipping,
        };
        Ok(effect)
    }
}

/// Money breakdown computed once when an order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CheckoutQuote {
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub shipping_fee: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub coupon_code: Option<String>,
}

/// `total = subtotal - discount + shipping`, floored at zero.
pub fn quote(
    subtotal: Decimal,
    offer: Option<&Offer>,
    shipping: &ShippingPolicy,
    now: DateTime<Utc>,
) -> Result<CheckoutQuote, PricingError> {
    let mut shipping_fee = shipping.fee_for(subtotal);
    let mut discount = Decimal::ZERO;

    if let Some(offer) = offer {
        match offer.evaluate(subtotal, now)? {
            DiscountEffect::Amount(amount) => discount = amount,
            DiscountEffect::WaiveShipping => shipping_fee = Decimal::ZERO,
        }
    }

    let total = (subtotal - discount + shipping_fee).max(Decimal::ZERO);
    Ok(CheckoutQuote {
        subtotal,
        discount,
        shipping_fee,
        total,
        coupon_code: offer.map(|o| o.code.clone()),
    })
}
