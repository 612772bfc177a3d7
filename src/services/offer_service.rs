use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::pricing::{DiscountType, PricingError, normalize_code, validate_offer_terms},
    dto::offers::{CreateOfferRequest, OfferList, UpdateOfferRequest},
    entity::offers::{
        ActiveModel as OfferActive, Column as OfferCol, Entity as Offers, Model as OfferModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Offer,
    response::ApiResponse,
    state::AppState,
};

pub async fn find_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Option<Offer>> {
    Offers::find()
        .filter(OfferCol::Code.eq(normalize_code(code)))
        .one(conn)
        .await?
        .map(offer_from_entity)
        .transpose()
}

/// Resolves an optional coupon entered at checkout. Blank codes mean no
/// coupon; unknown codes are rejected.
pub async fn resolve_coupon<C: ConnectionTrait>(
    conn: &C,
    code: Option<&str>,
) -> AppResult<Option<Offer>> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    match find_by_code(conn, code).await? {
        Some(offer) => Ok(Some(offer)),
        None => Err(PricingError::UnknownCoupon(normalize_code(code)).into()),
    }
}

pub async fn list_offers(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OfferList>> {
    ensure_admin(state, user).await?;
    let items = Offers::find()
        .order_by_desc(OfferCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(offer_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    let total = items.len() as i64;
    Ok(ApiResponse::paginated("Offers", OfferList { items }, 1, total, total))
}

pub async fn create_offer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOfferRequest,
) -> AppResult<ApiResponse<Offer>> {
    ensure_admin(state, user).await?;

    let code = normalize_code(&payload.code);
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".into()));
    }
    let min_order_amount = payload.min_order_amount.unwrap_or_default();
    validate_offer_terms(
        payload.discount_type,
        payload.discount_value,
        min_order_amount,
        payload.starts_at,
        payload.ends_at,
    )?;
    if find_by_code(&state.orm, &code).await?.is_some() {
        return Err(AppError::BadRequest(format!("offer {code} already exists")));
    }

    let now = Utc::now();
    let offer = OfferActive {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        title: Set(payload.title),
        discount_type: Set(payload.discount_type.as_str().to_string()),
        discount_value: Set(payload.discount_value),
        min_order_amount: Set(min_order_amount),
        starts_at: Set(payload.starts_at.map(Into::into)),
        ends_at: Set(payload.ends_at.map(Into::into)),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "offer_create",
        "offers",
        offer.id,
        serde_json::json!({ "code": offer.code }),
    )
    .await;

    Ok(ApiResponse::ok("Offer created", offer_from_entity(offer)?))
}

pub async fn update_offer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOfferRequest,
) -> AppResult<ApiResponse<Offer>> {
    ensure_admin(state, user).await?;
    let existing = Offers::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let current = offer_from_entity(existing.clone())?;

    let discount_type = payload.discount_type.unwrap_or(current.discount_type);
    let discount_value = payload.discount_value.unwrap_or(current.discount_value);
    let min_order_amount = payload.min_order_amount.unwrap_or(current.min_order_amount);
    let starts_at = payload.starts_at.or(current.starts_at);
    let ends_at = payload.ends_at.or(current.ends_at);
    validate_offer_terms(discount_type, discount_value, min_order_amount, starts_at, ends_at)?;

    let mut active: OfferActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.discount_type = Set(discount_type.as_str().to_string());
    active.discount_value = Set(discount_value);
    active.min_order_amount = Set(min_order_amount);
    active.starts_at = Set(starts_at.map(Into::into));
    active.ends_at = Set(ends_at.map(Into::into));
    active.updated_at = Set(Utc::now().into());
    let offer = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "offer_update",
        "offers",
        offer.id,
        serde_json::json!({ "code": offer.code, "is_active": offer.is_active }),
    )
    .await;

    Ok(ApiResponse::ok("Offer updated", offer_from_entity(offer)?))
}

pub async fn delete_offer(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(state, user).await?;
    let result = Offers::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "offer_delete",
        "offers",
        id,
        serde_json::json!({}),
    )
    .await;

    Ok(ApiResponse::ok("Deleted", serde_json::json!({})))
}

fn offer_from_entity(model: OfferModel) -> AppResult<Offer> {
    let discount_type = model
        .discount_type
        .parse::<DiscountType>()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    Ok(Offer {
        id: model.id,
        code: model.code,
        title: model.title,
        discount_type,
        discount_value: model.discount_value,
        min_order_amount: model.min_order_amount,
        starts_at: model.starts_at.map(|dt| dt.with_timezone(&Utc)),
        ends_at: model.ends_at.map(|dt| dt.with_timezone(&Utc)),
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
