use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        cart::{Cart, CartLine},
        checkout::{OrderLineDraft, OrderSource, draft_order},
        lifecycle::{DeliveryStatus, OrderStatus},
    },
    dto::orders::{
        ManualOrderRequest, OrderList, OrderWithItems, UpdateDeliveryRequest,
        UpdateOrderStatusRequest,
    },
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::ApiResponse,
    routes::params::{OrderListQuery, SortOrder},
    services::{
        offer_service,
        order_service::{find_items, insert_order, order_from_entity},
        product_service,
    },
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(state, user).await?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(delivery_status) = query.delivery_status {
        condition = condition.add(OrderCol::DeliveryStatus.eq(delivery_status.as_str()));
    }
    if let Some(source) = query.order_source {
        condition = condition.add(OrderCol::OrderSource.eq(source.as_str()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
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
        "Orders",
        OrderList { items: orders },
        page,
        limit,
        total,
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(state, user).await?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = find_items(&state.orm, order.id).await?;

    let data = OrderWithItems {
        order: order_from_entity(order)?,
        items,
    };
    Ok(ApiResponse::ok("Order found", data))
}

/// Moves the order along its delivery states. Only forward moves and
/// cancellation of a live order are accepted.
pub async fn update_delivery_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDeliveryRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(state, user).await?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = existing
        .delivery_status
        .parse::<DeliveryStatus>()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    let next = current.transition_to(payload.delivery_status)?;

    let mut active: OrderActive = existing.into();
    active.delivery_status = Set(next.as_str().to_string());
    if let Some(status) = OrderStatus::implied_by(next) {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(notes) = payload.tracking_notes {
        let notes = notes.trim().to_string();
        active.tracking_notes = Set((!notes.is_empty()).then_some(notes));
    }
    if let Some(date) = payload.estimated_delivery {
        active.estimated_delivery = Set(Some(date));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "delivery status changed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delivery_update",
        "orders",
        order.id,
        serde_json::json!({ "from": current, "to": next }),
    )
    .await;

    Ok(ApiResponse::ok("Order updated", order_from_entity(order)?))
}

/// Sets the coarse commercial status; it does not touch delivery status.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(state, user).await?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_status_update",
        "orders",
        order.id,
        serde_json::json!({ "status": order.status }),
    )
    .await;

    Ok(ApiResponse::ok("Order updated", order_from_entity(order)?))
}

/// Records an order a customer placed over WhatsApp. Lines are priced from
/// the current catalog and go through the same checks as a storefront
/// checkout.
pub async fn create_manual_order(
    state: &AppState,
    user: &AuthUser,
    payload: ManualOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(state, user).await?;

    let mut cart = Cart::new();
    for line in &payload.items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "quantity for {} must be greater than 0",
                line.product_id
            )));
        }
        let product = product_service::find_product(&state.orm, &line.product_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("unknown product {}", line.product_id)))?;
        let snapshot = product.snapshot(line.pack_size.as_deref())?;
        cart.add_item(
            CartLine::from_snapshot(
                &product.id,
                snapshot,
                product.image_url.clone(),
                product.category.clone(),
            ),
            line.quantity,
        );
    }

    let txn = state.orm.begin().await?;
    let offer = offer_service::resolve_coupon(&txn, payload.coupon_code.as_deref()).await?;
    let draft = draft_order(
        cart.lines().iter().map(OrderLineDraft::from).collect(),
        &payload.shipping_address,
        offer.as_ref(),
        OrderSource::Whatsapp,
        &state.settings.checkout_rules(),
        Utc::now(),
    )?;
    let (order, items) = insert_order(
        &txn,
        None,
        &draft,
        payload.notes,
        state.settings.delivery_lead_days,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, total = %order.total_amount, "whatsapp order recorded");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_manual_create",
        "orders",
        order.id,
        serde_json::json!({ "lines": items.len() }),
    )
    .await;

    Ok(ApiResponse::ok("Order created", OrderWithItems { order, items }))
}
