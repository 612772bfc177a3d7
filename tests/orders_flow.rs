use rust_decimal::Decimal;
use storefront_api::{
    config::StoreSettings,
    db::{create_pool, run_migrations},
    domain::{
        catalog::{BulkPack, ProductType},
        checkout::{OrderSource, ShippingAddress},
        lifecycle::{DeliveryStatus, OrderStatus},
    },
    dto::{
        cart::{AddToCartRequest, QuoteQuery, UpdateQuantityRequest},
        orders::{
            CheckoutRequest, ManualOrderLine, ManualOrderRequest, UpdateDeliveryRequest,
        },
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::AppError,
    middleware::auth::{ADMIN_ROLE, AuthUser},
    routes::params::OrderListQuery,
    services::{
        admin_service, auth_service, cart_service, order_service, product_service,
        tracking_service,
    },
    state::AppState,
};
use uuid::Uuid;

// Integration flow against a real database. Skipped unless one is configured.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool, StoreSettings::default(), "test-secret")))
}

fn shopper() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        email: Some("shopper@example.com".into()),
    }
}

async fn staff(state: &AppState) -> anyhow::Result<AuthUser> {
    let user = AuthUser {
        user_id: Uuid::new_v4(),
        email: Some("staff@example.com".into()),
    };
    auth_service::grant_role(&state.pool, user.user_id, ADMIN_ROLE).await?;
    Ok(user)
}

/// Creates a uniquely named Mango Milk at 549 with a 3 pack at 1499.
async fn mango_milk(state: &AppState, admin: &AuthUser) -> anyhow::Result<String> {
    let id = format!("mango-milk-{}", &Uuid::new_v4().simple().to_string()[..8]);
    product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            id: id.clone(),
            name: "Mango Milk".into(),
            description: Some("Alphonso mango in milk chocolate".into()),
            price: Decimal::from(549),
            category: "bars".into(),
            product_type: ProductType::Milk,
            image_url: None,
            in_stock: Some(true),
            bulk_packs: vec![BulkPack {
                size: "3 pack".into(),
                price: Decimal::from(1499),
            }],
        },
    )
    .await?;
    Ok(id)
}

fn address(city: &str) -> ShippingAddress {
    ShippingAddress {
        full_name: "Asha Rao".into(),
        phone: "98765 43210".into(),
        address: "12 Road No. 3, Banjara Hills".into(),
        city: city.into(),
        state: "Telangana".into(),
        pincode: "500034".into(),
    }
}

async fn add(
    state: &AppState,
    user: &AuthUser,
    product_id: &str,
    pack_size: Option<&str>,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_to_cart(
        state,
        user,
        AddToCartRequest {
            product_id: product_id.to_string(),
            pack_size: pack_size.map(str::to_string),
            quantity: Some(quantity),
        },
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn checkout_with_coupon_then_track_and_deliver() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = staff(&state).await?;
    let user = shopper();
    let product_id = mango_milk(&state, &admin).await?;

    // Same product twice merges into one line.
    add(&state, &user, &product_id, None, 1).await?;
    add(&state, &user, &product_id, None, 1).await?;
    add(&state, &user, &product_id, Some("3 pack"), 1).await?;
    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total_items, 3);

    // Back down to a single Mango Milk.
    cart_service::update_quantity(&state, &user, &product_id, UpdateQuantityRequest { quantity: 1 })
        .await?;
    cart_service::remove_item(&state, &user, &format!("{product_id}:3 pack")).await?;

    let preview = cart_service::quote_cart(
        &state,
        &user,
        QuoteQuery {
            coupon: Some("choco10".into()),
        },
    )
    .await?
    .data
    .expect("quote");
    assert_eq!(preview.quote.total, Decimal::new(5441, 1));

    let placed = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            shipping_address: address("hyderabad"),
            coupon_code: Some("CHOCO10".into()),
            notes: Some("Ring the bell".into()),
        },
    )
    .await?
    .data
    .expect("checkout data");

    let order = &placed.order;
    assert_eq!(order.subtotal, Decimal::from(549));
    assert_eq!(order.discount_amount, Decimal::new(549, 1));
    assert_eq!(order.shipping_fee, Decimal::from(50));
    assert_eq!(order.total_amount, Decimal::new(5441, 1));
    assert_eq!(order.coupon_code.as_deref(), Some("CHOCO10"));
    assert_eq!(order.order_source, OrderSource::Website);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.delivery_status, DeliveryStatus::Processing);
    assert_eq!(order.shipping_address.city, "Hyderabad");
    assert_eq!(placed.items.len(), 1);
    assert!(placed.whatsapp.link.starts_with("https://wa.me/"));
    assert!(placed.whatsapp.message.contains(&order.tracking_token));

    // Cart is emptied by a successful checkout.
    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    // Anonymous tracking by token.
    let tracked = tracking_service::track_order(&state.pool, &order.tracking_token)
        .await?
        .data
        .expect("tracking");
    assert_eq!(tracked.tracking_token, order.tracking_token);
    assert_eq!(tracked.total_amount, order.total_amount);
    assert_eq!(tracked.city, "Hyderabad");
    let tracked_json = serde_json::to_value(&tracked)?;
    assert!(tracked_json.get("order_id").is_none());
    assert!(!tracked_json.to_string().contains(&order.id.to_string()));
    assert_eq!(tracked.delivery_status, DeliveryStatus::Processing);
    let items = tracking_service::track_order_items(&state.pool, &order.tracking_token)
        .await?
        .data
        .expect("items");
    assert_eq!(items.items.len(), 1);

    // Staff jump forward, then try to go back.
    let shipped = admin_service::update_delivery_status(
        &state,
        &admin,
        order.id,
        UpdateDeliveryRequest {
            delivery_status: DeliveryStatus::Shipped,
            tracking_notes: Some("Handed to courier".into()),
            estimated_delivery: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(shipped.delivery_status, DeliveryStatus::Shipped);

    let backwards = admin_service::update_delivery_status(
        &state,
        &admin,
        order.id,
        UpdateDeliveryRequest {
            delivery_status: DeliveryStatus::Packed,
            tracking_notes: None,
            estimated_delivery: None,
        },
    )
    .await;
    assert!(matches!(backwards, Err(AppError::BadRequest(_))));

    let delivered = admin_service::update_delivery_status(
        &state,
        &admin,
        order.id,
        UpdateDeliveryRequest {
            delivery_status: DeliveryStatus::Delivered,
            tracking_notes: None,
            estimated_delivery: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(delivered.status, OrderStatus::Completed);

    let tracked = tracking_service::track_order(&state.pool, &order.tracking_token)
        .await?
        .data
        .expect("tracking");
    assert_eq!(tracked.delivery_status, DeliveryStatus::Delivered);
    assert_eq!(tracked.tracking_notes.as_deref(), Some("Handed to courier"));

    // Later price changes leave placed orders untouched.
    product_service::update_product(
        &state,
        &admin,
        &product_id,
        UpdateProductRequest {
            name: None,
            description: None,
            price: Some(Decimal::from(599)),
            category: None,
            product_type: None,
            image_url: None,
            in_stock: None,
            bulk_packs: None,
        },
    )
    .await?;
    let reread = order_service::get_order(&state, &user, order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(reread.order.total_amount, Decimal::new(5441, 1));
    assert_eq!(reread.items[0].price, Decimal::from(549));

    // Referenced products cannot be deleted.
    let deleted = product_service::delete_product(&state, &admin, &product_id).await;
    assert!(matches!(deleted, Err(AppError::BadRequest(_))));

    Ok(())
}

#[tokio::test]
async fn rejected_checkout_leaves_no_order_and_keeps_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = staff(&state).await?;
    let user = shopper();
    let product_id = mango_milk(&state, &admin).await?;

    let empty = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            shipping_address: address("Hyderabad"),
            coupon_code: None,
            notes: None,
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(msg)) if msg == "cart is empty"));

    add(&state, &user, &product_id, None, 2).await?;

    let outside = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            shipping_address: address("Bengaluru"),
            coupon_code: None,
            notes: None,
        },
    )
    .await;
    assert!(matches!(outside, Err(AppError::BadRequest(_))));

    let bad_coupon = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            shipping_address: address("Secunderabad"),
            coupon_code: Some("NOPE".into()),
            notes: None,
        },
    )
    .await;
    assert!(bad_coupon.is_err());

    let orders = order_service::list_orders(&state, &user, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert!(orders.items.is_empty());

    let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.total_items, 2);
    Ok(())
}

#[tokio::test]
async fn staff_enter_whatsapp_orders_and_shoppers_cannot() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = staff(&state).await?;
    let product_id = mango_milk(&state, &admin).await?;

    let request = || ManualOrderRequest {
        items: vec![ManualOrderLine {
            product_id: product_id.clone(),
            pack_size: None,
            quantity: 2,
        }],
        shipping_address: address("Secunderabad"),
        coupon_code: None,
        notes: Some("Customer messaged at 9am".into()),
    };

    let denied = admin_service::create_manual_order(&state, &shopper(), request()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let first = admin_service::create_manual_order(&state, &admin, request())
        .await?
        .data
        .expect("order");
    let second = admin_service::create_manual_order(&state, &admin, request())
        .await?
        .data
        .expect("order");

    assert_eq!(first.order.order_source, OrderSource::Whatsapp);
    assert_eq!(first.order.user_id, None);
    // 2 x 549 clears the free shipping threshold.
    assert_eq!(first.order.shipping_fee, Decimal::ZERO);
    assert_eq!(first.order.total_amount, Decimal::from(1098));
    assert_ne!(first.order.tracking_token, second.order.tracking_token);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_first_adds_merge_into_one_line() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = staff(&state).await?;
    let product_id = mango_milk(&state, &admin).await?;

    for _ in 0..10 {
        let user = shopper();
        let (first, second) = tokio::join!(
            add(&state, &user, &product_id, None, 1),
            add(&state, &user, &product_id, None, 1),
        );
        first?;
        second?;

        let cart = cart_service::get_cart(&state, &user).await?.data.expect("cart");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 2);
    }
    Ok(())
}
