use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        cart::CartChange,
        checkout::{
            CheckoutError, OrderDraft, OrderLineDraft, OrderSource, PAYMENT_METHOD_COD,
            ShippingAddress, draft_order,
        },
        handoff,
        lifecycle::{DeliveryStatus, OrderStatus},
    },
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderList, OrderWithItems},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::ApiResponse,
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, offer_service},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(delivery_status) = query.delivery_status {
        condition = condition.add(OrderCol::DeliveryStatus.eq(delivery_status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::paginated(
        "Ok",
        OrderList { items: orders },
        page,
        limit,
        total,
    ))
}

/// Turns the shopper's cart into an order. The order, its lines and the
/// cart clear commit together; on any failure the cart is left as it was.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let txn = state.orm.begin().await?;

    let cart = cart_service::load_cart(&txn, user.user_id, true).await?;
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let offer = offer_service::resolve_coupon(&txn, payload.coupon_code.as_deref()).await?;
    let lines = cart.lines().iter().map(OrderLineDraft::from).collect();
    let draft = draft_order(
        lines,
        &payload.shipping_address,
        offer.as_ref(),
        OrderSource::Website,
        &state.settings.checkout_rules(),
        Utc::now(),
    )?;

    let (order, items) = insert_order(
        &txn,
        Some(user.user_id),
        &draft,
        payload.notes,
        state.settings.delivery_lead_days,
    )
    .await?;

    cart_service::apply_change(&txn, user.user_id, &CartChange::Cleared).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        total = %order.total_amount,
        lines = items.len(),
        "order placed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "checkout",
        "orders",
        order.id,
        serde_json::json!({ "total": order.total_amount, "coupon": order.coupon_code }),
    )
    .await;

    let whatsapp = handoff::build(&order, &items, &state.settings.whatsapp_number);
    Ok(ApiResponse::ok(
        "Checkout success",
        CheckoutResponse {
            order,
            items,
            whatsapp,
        },
    ))
}

/// Inserts a priced, validated order and its lines. The header row is
/// written first; callers pass a transaction so both land or neither does.
pub async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    user_id: Option<Uuid>,
    draft: &OrderDraft,
    customer_notes: Option<String>,
    delivery_lead_days: i64,
) -> AppResult<(Order, Vec<OrderItem>)> {
    let now = Utc::now();
    let estimated_delivery = now
        .date_naive()
        .checked_add_signed(Duration::days(delivery_lead_days));
    let shipping_address =
        serde_json::to_value(&draft.address).map_err(|e| AppError::Internal(e.into()))?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        tracking_token: Set(draft.tracking_token.clone()),
        subtotal: Set(draft.quote.subtotal),
        discount_amount: Set(draft.quote.discount),
        shipping_fee: Set(draft.quote.shipping_fee),
        total_amount: Set(draft.quote.total),
        coupon_code: Set(draft.quote.coupon_code.clone()),
        payment_method: Set(PAYMENT_METHOD_COD.to_string()),
        order_source: Set(draft.source.as_str().to_string()),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        delivery_status: Set(DeliveryStatus::Processing.as_str().to_string()),
        shipping_address: Set(shipping_address),
        estimated_delivery: Set(estimated_delivery),
        tracking_notes: Set(None),
        customer_notes: Set(customer_notes.filter(|n| !n.trim().is_empty())),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    let mut items = Vec::with_capacity(draft.lines.len());
    for line in &draft.lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id.clone()),
            product_name: Set(line.product_name.clone()),
            product_image: Set(line.product_image.clone()),
            pack_size: Set(line.pack_size.clone()),
            quantity: Set(line.quantity),
            price: Set(line.price),
            created_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
        items.push(order_item_from_entity(item));
    }

    Ok((order_from_entity(order)?, items))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = find_items(&state.orm, order.id).await?;

    Ok(ApiResponse::ok(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
    ))
}

pub async fn find_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();
    Ok(items)
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let order_source = model
        .order_source
        .parse::<OrderSource>()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    let status = model
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    let delivery_status = model
        .delivery_status
        .parse::<DeliveryStatus>()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    let shipping_address: ShippingAddress = serde_json::from_value(model.shipping_address)
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        tracking_token: model.tracking_token,
        subtotal: model.subtotal,
        discount_amount: model.discount_amount,
        shipping_fee: model.shipping_fee,
        total_amount: model.total_amount,
        coupon_code: model.coupon_code,
        payment_method: model.payment_method,
        order_source,
        status,
        delivery_status,
        shipping_address,
        estimated_delivery: model.estimated_delivery,
        tracking_notes: model.tracking_notes,
        customer_notes: model.customer_notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        product_image: model.product_image,
        pack_size: model.pack_size,
        quantity: model.quantity,
        price: model.price,
    }
}
