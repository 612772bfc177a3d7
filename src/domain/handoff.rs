//! Pre-filled WhatsApp message sent to the store after checkout.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WhatsappHandoff {
    /// Plain text; the storefront offers it for copy-to-clipboard too.
    pub message: String,
    /// `https://wa.me/<number>?text=<message>`
    pub link: String,
}

/// Short human reference for an order, e.g. `#1A2B3C4D`.
pub fn order_reference(order_id: Uuid) -> String {
    let id = order_id.simple().to_string();
    format!("#{}", id[..8].to_uppercase())
}

pub fn format_rupees(amount: Decimal) -> String {
    let amount = amount.round_dp(2);
    if amount.fract().is_zero() {
        format!("₹{}", amount.trunc())
    } else {
        format!("₹{amount:.2}")
    }
}

pub fn build_message(order: &Order, items: &[OrderItem]) -> String {
    let address = &order.shipping_address;
    let mut lines = vec![
        "Hello! I'd like to confirm my order.".to_string(),
        String::new(),
        format!("Order: {}", order_reference(order.id)),
        format!("Tracking token: {}", order.tracking_token),
        String::new(),
        "Items:".to_string(),
    ];
    lines.extend(items.iter().map(|item| {
        format!(
            "- {} x{} = {}",
            item.product_name,
            item.quantity,
            format_rupees(item.price * Decimal::from(item.quantity))
        )
    }));
    lines.push(String::new());
    lines.push(format!("Subtotal: {}", format_rupees(order.subtotal)));
    if !order.discount_amount.is_zero() {
        let discount = format_rupees(order.discount_amount);
        lines.push(match &order.coupon_code {
            Some(code) => format!("Discount ({code}): -{discount}"),
            None => format!("Discount: -{discount}"),
        });
    }
    lines.push(if order.shipping_fee.is_zero() {
        "Shipping: FREE".to_string()
    } else {
        format!("Shipping: {}", format_rupees(order.shipping_fee))
    });
    lines.push(format!("Total: {}", format_rupees(order.total_amount)));
    lines.push("Payment: Cash on Delivery".to_string());
    lines.push(String::new());
    lines.push("Deliver to:".to_string());
    lines.push(format!("{}, {}", address.full_name, address.phone));
    lines.push(address.address.clone());
    lines.push(format!(
        "{}, {} - {}",
        address.city, address.state, address.pincode
    ));
    lines.join("\n")
}

pub fn build(order: &Order, items: &[OrderItem], business_number: &str) -> WhatsappHandoff {
    let message = build_message(order, items);
    let number: String = business_number
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    let link = format!("https://wa.me/{number}?text={}", urlencoding::encode(&message));
    WhatsappHandoff { message, link }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{
        checkout::{OrderSource, ShippingAddress},
        lifecycle::{DeliveryStatus, OrderStatus},
    };

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            user_id: None,
            tracking_token: "abc123".into(),
            subtotal: Decimal::from(549),
            discount_amount: Decimal::new(549, 1),
            shipping_fee: Decimal::from(50),
            total_amount: Decimal::new(5441, 1),
            coupon_code: Some("CHOCO10".into()),
            payment_method: "cod".into(),
            order_source: OrderSource::Website,
            status: OrderStatus::Pending,
            delivery_status: DeliveryStatus::Processing,
            shipping_address: ShippingAddress {
                full_name: "Asha Rao".into(),
                phone: "9876543210".into(),
                address: "12 Road No. 3".into(),
                city: "Hyderabad".into(),
                state: "Telangana".into(),
                pincode: "500034".into(),
            },
            estimated_delivery: None,
            tracking_notes: None,
            customer_notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(order_id: Uuid) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: "mango-milk".into(),
            product_name: "Mango Milk".into(),
            product_image: None,
            pack_size: None,
            quantity: 1,
            price: Decimal::from(549),
        }
    }

    #[test]
    fn rupee_formatting() {
        assert_eq!(format_rupees(Decimal::from(549)), "₹549");
        assert_eq!(format_rupees(Decimal::new(5490, 2)), "₹54.90");
        assert_eq!(format_rupees(Decimal::new(54410, 2)), "₹544.10");
    }

    #[test]
    fn message_lists_items_and_breakdown() {
        let order = order();
        let msg = build_message(&order, &[item(order.id)]);

        assert!(msg.contains("- Mango Milk x1 = ₹549"));
        assert!(msg.contains("Discount (CHOCO10): -₹54.90"));
        assert!(msg.contains("Shipping: ₹50"));
        assert!(msg.contains("Total: ₹544.10"));
        assert!(msg.contains("Tracking token: abc123"));
        assert!(msg.ends_with("Hyderabad, Telangana - 500034"));
        assert!(msg.contains("Items:\n- Mango Milk"));
    }

    #[test]
    fn free_shipping_and_no_coupon() {
        let mut order = order();
        order.shipping_fee = Decimal::ZERO;
        order.discount_amount = Decimal::ZERO;
        order.coupon_code = None;
        let msg = build_message(&order, &[]);

        assert!(msg.contains("Shipping: FREE"));
        assert!(!msg.contains("Discount"));
        assert!(msg.contains("Items:\n\nSubtotal: ₹549"));
    }

    #[test]
    fn link_targets_business_number_with_encoded_text() {
        let order = order();
        let handoff = build(&order, &[item(order.id)], "+91 98765-43210");

        assert!(handoff.link.starts_with("https://wa.me/919876543210?text=Hello%21"));
        assert!(!handoff.link.contains(' '));
    }

    #[test]
    fn reference_is_short_uppercase() {
        let id = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000000").unwrap_or_default();
        assert_eq!(order_reference(id), "#1A2B3C4D");
    }
}
