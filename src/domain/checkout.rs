use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        cart::CartLine,
        pricing::{CheckoutQuote, PricingError, ShippingPolicy, quote},
    },
    models::Offer,
};

#[derive(Debug, Error, PartialEq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("phone number must have 10 digits")]
    InvalidPhone,

    #[error("pincode must have 6 digits")]
    InvalidPincode,

    #[error("we currently deliver only to {allowed}")]
    CityNotServed { city: String, allowed: String },

    #[error("unknown order source {0}")]
    UnknownSource(String),

    #[error("order amount exceeds ₹9,999,999,999.99")]
    AmountTooLarge,

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// Placed by the shopper through the storefront.
    Website,
    /// Entered by staff on behalf of a customer who ordered over WhatsApp.
    Whatsapp,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Website => "website",
            OrderSource::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for OrderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSource {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "website" => Ok(OrderSource::Website),
            "whatsapp" => Ok(OrderSource::Whatsapp),
            other => Err(CheckoutError::UnknownSource(other.to_string())),
        }
    }
}

/// Only cash on delivery is offered.
pub const PAYMENT_METHOD_COD: &str = "cod";

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Normalizes a phone number to its 10 local digits, dropping a leading
/// `+91`/`91`/`0`.
pub fn normalize_phone(phone: &str) -> Result<String, CheckoutError> {
    let all = digits(phone);
    let local = match all.len() {
        10 => all.as_str(),
        11 if all.starts_with('0') => &all[1..],
        12 if all.starts_with("91") => &all[2..],
        _ => return Err(CheckoutError::InvalidPhone),
    };
    Ok(local.to_string())
}

impl ShippingAddress {
    /// Trims every field, checks they are present and well-formed, and
    /// enforces the delivery city allow-list (case-insensitive).
    pub fn validated(&self, allowed_cities: &[String]) -> Result<ShippingAddress, CheckoutError> {
        let required = [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("pincode", &self.pincode),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingField(name));
            }
        }

        let phone = normalize_phone(&self.phone)?;

        let pincode = self.pincode.trim();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err(CheckoutError::InvalidPincode);
        }

        let city = self.city.trim();
        let served = allowed_cities
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(city))
            .ok_or_else(|| CheckoutError::CityNotServed {
                city: city.to_string(),
                allowed: allowed_cities.join(" and "),
            })?;

        Ok(ShippingAddress {
            full_name: self.full_name.trim().to_string(),
            phone,
            address: self.address.trim().to_string(),
            city: served.clone(),
            state: self.state.trim().to_string(),
            pincode: pincode.to_string(),
        })
    }
}

/// One line of an order about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineDraft {
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub pack_size: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
}

impl From<&CartLine> for OrderLineDraft {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            product_name: line.name.clone(),
            product_image: line.image_url.clone(),
            pack_size: line.pack_size.clone(),
            quantity: line.quantity,
            price: line.unit_price,
        }
    }
}

/// Everything needed to insert an order and its items, already validated
/// and priced.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub tracking_token: String,
    pub lines: Vec<OrderLineDraft>,
    pub quote: CheckoutQuote,
    pub address: ShippingAddress,
    pub source: OrderSource,
}

/// Rules a checkout is validated against.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRules {
    pub shipping: ShippingPolicy,
    pub allowed_cities: Vec<String>,
}

/// Largest amount the money columns hold: `NUMERIC(12, 2)`.
pub const MAX_ORDER_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Opaque token handed to the customer for anonymous tracking.
pub fn new_tracking_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Validates the order inputs and computes its money breakdown. Nothing is
/// written; a rejected draft leaves no trace.
pub fn draft_order(
    lines: Vec<OrderLineDraft>,
    address: &ShippingAddress,
    offer: Option<&Offer>,
    source: OrderSource,
    rules: &CheckoutRules,
    now: DateTime<Utc>,
) -> Result<OrderDraft, CheckoutError> {
    let lines: Vec<OrderLineDraft> = lines.into_iter().filter(|l| l.quantity > 0).collect();
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let address = address.validated(&rules.allowed_cities)?;

    let subtotal: Decimal = lines
        .iter()
        .map(|l| l.price * Decimal::from(l.quantity))
        .sum();
    let quote = quote(subtotal, offer, &rules.shipping, now)?;
    if quote.subtotal > MAX_ORDER_AMOUNT || quote.total > MAX_ORDER_AMOUNT {
        return Err(CheckoutError::AmountTooLarge);
    }

    Ok(OrderDraft {
        tracking_token: new_tracking_token(),
        lines,
        quote,
        address,
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use testresult::TestResult;

    use super::*;
    use crate::domain::pricing::DiscountType;

    fn rules() -> CheckoutRules {
        CheckoutRules {
            shipping: ShippingPolicy::default(),
            allowed_cities: vec!["Hyderabad".into(), "Secunderabad".into()],
        }
    }

    fn address(city: &str) -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".into(),
            phone: "+91 98765 43210".into(),
            address: "12 Road No. 3, Banjara Hills".into(),
            city: city.into(),
            state: "Telangana".into(),
            pincode: "500034".into(),
        }
    }

    fn mango_line(quantity: i32) -> OrderLineDraft {
        OrderLineDraft {
            product_id: "mango-milk".into(),
            product_name: "Mango Milk".into(),
            product_image: None,
            pack_size: None,
            quantity,
            price: Decimal::from(549),
        }
    }

    fn choco10() -> Offer {
        Offer {
            id: Uuid::new_v4(),
            code: "CHOCO10".into(),
            title: "10% off".into(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            min_order_amount: Decimal::ZERO,
            starts_at: None,
            ends_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn city_gate_is_case_insensitive() -> TestResult {
        let ok = address("  hyderabad ").validated(&rules().allowed_cities)?;
        assert_eq!(ok.city, "Hyderabad");
        assert_eq!(ok.phone, "9876543210");

        let err = address("Bengaluru").validated(&rules().allowed_cities);
        assert!(matches!(err, Err(CheckoutError::CityNotServed { .. })));
        Ok(())
    }

    #[test]
    fn blank_fields_and_bad_numbers_rejected() {
        let allowed = rules().allowed_cities;

        let mut a = address("Hyderabad");
        a.state = "  ".into();
        assert_eq!(a.validated(&allowed), Err(CheckoutError::MissingField("state")));

        let mut a = address("Hyderabad");
        a.phone = "12345".into();
        assert_eq!(a.validated(&allowed), Err(CheckoutError::InvalidPhone));

        let mut a = address("Hyderabad");
        a.pincode = "5000".into();
        assert_eq!(a.validated(&allowed), Err(CheckoutError::InvalidPincode));
    }

    #[test]
    fn empty_cart_is_rejected_before_anything_else() {
        let err = draft_order(
            vec![mango_line(0)],
            &address("Nowhere"),
            None,
            OrderSource::Website,
            &rules(),
            Utc::now(),
        );
        assert_eq!(err, Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn amounts_beyond_the_money_columns_are_rejected() -> TestResult {
        assert_eq!(MAX_ORDER_AMOUNT, "9999999999.99".parse::<Decimal>()?);

        let err = draft_order(
            vec![mango_line(20_000_000)],
            &address("Hyderabad"),
            None,
            OrderSource::Website,
            &rules(),
            Utc::now(),
        );
        assert_eq!(err.map(|d| d.quote.total), Err(CheckoutError::AmountTooLarge));

        let draft = draft_order(
            vec![mango_line(1_000_000)],
            &address("Hyderabad"),
            None,
            OrderSource::Website,
            &rules(),
            Utc::now(),
        )?;
        assert_eq!(draft.quote.subtotal, Decimal::from(549_000_000));
        Ok(())
    }

    #[test]
    fn draft_total_is_subtotal_minus_discount_plus_shipping() -> TestResult {
        let offer = choco10();
        let draft = draft_order(
            vec![mango_line(1)],
            &address("Secunderabad"),
            Some(&offer),
            OrderSource::Website,
            &rules(),
            Utc::now(),
        )?;

        assert_eq!(draft.quote.subtotal, Decimal::from(549));
        assert_eq!(draft.quote.discount, Decimal::new(549, 1));
        assert_eq!(draft.quote.shipping_fee, Decimal::from(50));
        assert_eq!(draft.quote.total, Decimal::new(5441, 1));
        assert_eq!(draft.tracking_token.len(), 32);
        Ok(())
    }

    #[test]
    fn tracking_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000).map(|_| new_tracking_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
