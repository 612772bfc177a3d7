use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        cart::{Cart, CartChange, CartLine},
        pricing,
    },
    dto::cart::{AddToCartRequest, CartQuote, CartView, QuoteQuery, UpdateQuantityRequest},
    entity::cart_items::{
        ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::{offer_service, product_service},
    state::AppState,
};

/// Loads the shopper's cart. With `lock` the whole cart stays locked until
/// the surrounding transaction ends, including lines not written yet, so
/// concurrent writers for one shopper run one after another.
pub async fn load_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid, lock: bool) -> AppResult<Cart> {
    let mut finder = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt);
    if lock {
        lock_cart(conn, user_id).await?;
        finder = finder.lock(LockType::Update);
    }
    let rows = finder.all(conn).await?;
    Ok(Cart::from_lines(rows.into_iter().map(line_from_entity)))
}

/// `FOR UPDATE` alone cannot lock a line that does not exist yet.
async fn lock_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock($1)",
        [cart_lock_key(user_id).into()],
    ))
    .await?;
    Ok(())
}

fn cart_lock_key(user_id: Uuid) -> i64 {
    user_id.as_u64_pair().0 as i64
}

/// Writes the single row change a cart mutation produced.
pub async fn apply_change<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    change: &CartChange,
) -> AppResult<()> {
    let now = Utc::now();
    match change {
        CartChange::Inserted(line) => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                line_key: Set(line.line_key.clone()),
                product_id: Set(line.product_id.clone()),
                pack_size: Set(line.pack_size.clone()),
                name: Set(line.name.clone()),
                unit_price: Set(line.unit_price),
                image_url: Set(line.image_url.clone()),
                category: Set(line.category.clone()),
                quantity: Set(line.quantity),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(conn)
            .await?;
        }
        CartChange::Updated(line) => {
            CartItems::update_many()
                .col_expr(CartCol::Quantity, Expr::value(line.quantity))
                .col_expr(CartCol::UpdatedAt, Expr::value(now))
                .filter(line_filter(user_id, &line.line_key))
                .exec(conn)
                .await?;
        }
        CartChange::Removed(line_key) => {
            CartItems::delete_many()
                .filter(line_filter(user_id, line_key))
                .exec(conn)
                .await?;
        }
        CartChange::Cleared => {
            CartItems::delete_many()
                .filter(CartCol::UserId.eq(user_id))
                .exec(conn)
                .await?;
        }
        CartChange::Unchanged => {}
    }
    Ok(())
}

fn line_filter(user_id: Uuid, line_key: &str) -> Condition {
    Condition::all()
        .add(CartCol::UserId.eq(user_id))
        .add(CartCol::LineKey.eq(line_key))
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = load_cart(&state.orm, user.user_id, false).await?;
    Ok(ApiResponse::ok("OK", CartView::from(cart)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = payload.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product = product_service::find_product(&state.orm, &payload.product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let snapshot = product.snapshot(payload.pack_size.as_deref())?;
    let item = CartLine::from_snapshot(
        &product.id,
        snapshot,
        product.image_url.clone(),
        product.category.clone(),
    );

    let txn = state.orm.begin().await?;
    let mut cart = load_cart(&txn, user.user_id, true).await?;
    let change = cart.add_item(item, quantity);
    apply_change(&txn, user.user_id, &change).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        &payload.product_id,
        serde_json::json!({
            "pack_size": payload.pack_size,
            "quantity": quantity,
        }),
    )
    .await;

    Ok(ApiResponse::ok("Added to cart", CartView::from(cart)))
}

pub async fn update_quantity(
    state: &AppState,
    user: &AuthUser,
    line_key: &str,
    payload: UpdateQuantityRequest,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let mut cart = load_cart(&txn, user.user_id, true).await?;
    if cart.get(line_key).is_none() {
        return Err(AppError::NotFound);
    }
    let change = cart.update_quantity(line_key, payload.quantity);
    apply_change(&txn, user.user_id, &change).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        line_key,
        serde_json::json!({ "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::ok("Cart updated", CartView::from(cart)))
}

/// Removing a line that is not in the cart is not an error.
pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    line_key: &str,
) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let mut cart = load_cart(&txn, user.user_id, true).await?;
    let change = cart.remove_item(line_key);
    apply_change(&txn, user.user_id, &change).await?;
    txn.commit().await?;

    if change != CartChange::Unchanged {
        audit::record(
            &state.orm,
            Some(user.user_id),
            "cart_remove",
            "cart_items",
            line_key,
            serde_json::json!({}),
        )
        .await;
    }

    Ok(ApiResponse::ok("Removed from cart", CartView::from(cart)))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let mut cart = load_cart(&txn, user.user_id, true).await?;
    let change = cart.clear();
    apply_change(&txn, user.user_id, &change).await?;
    txn.commit().await?;

    Ok(ApiResponse::ok("Cart cleared", CartView::from(cart)))
}

/// Previews the checkout totals for the current cart and an optional coupon.
pub async fn quote_cart(
    state: &AppState,
    user: &AuthUser,
    query: QuoteQuery,
) -> AppResult<ApiResponse<CartQuote>> {
    let cart = load_cart(&state.orm, user.user_id, false).await?;
    let offer = offer_service::resolve_coupon(&state.orm, query.coupon.as_deref()).await?;
    let quote = pricing::quote(
        cart.total_price(),
        offer.as_ref(),
        &state.settings.shipping,
        Utc::now(),
    )?;

    Ok(ApiResponse::ok(
        "Quote",
        CartQuote {
            cart: CartView::from(cart),
            quote,
        },
    ))
}

pub(crate) fn line_from_entity(model: CartModel) -> CartLine {
    CartLine {
        line_key: model.line_key,
        product_id: model.product_id,
        pack_size: model.pack_size,
        name: model.name,
        unit_price: model.unit_price,
        image_url: model.image_url,
        category: model.category,
        quantity: model.quantity,
    }
}
