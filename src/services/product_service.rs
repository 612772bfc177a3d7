use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;

use crate::{
    audit,
    domain::catalog::{BulkPack, ProductType, validate_pricing, validate_slug},
    dto::products::{CreateProductRequest, ProductCard, ProductList, UpdateProductRequest},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::ApiResponse,
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// `ILIKE` pattern matching `search` anywhere, with its wildcards taken
/// literally. Backslash is the default `LIKE` escape in Postgres.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::from("%");
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category.clone()));
    }

    if let Some(product_type) = query.product_type {
        condition = condition.add(Column::ProductType.eq(product_type.as_str()));
    }

    if let Some(in_stock) = query.in_stock {
        condition = condition.add(Column::InStock.eq(in_stock));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| product_from_entity(model).map(ProductCard::from))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::paginated(
        "Products",
        ProductList { items },
        page,
        limit,
        total,
    ))
}

/// Catalog lookup used by the cart and staff order entry.
pub async fn find_product<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<Option<Product>> {
    Products::find_by_id(id.to_string())
        .one(conn)
        .await?
        .map(product_from_entity)
        .transpose()
}

pub async fn get_product(state: &AppState, id: &str) -> AppResult<ApiResponse<ProductCard>> {
    let product = find_product(&state.orm, id).await?.ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok("Product", ProductCard::from(product)))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(state, user).await?;
    validate_slug(&payload.id)?;
    validate_pricing(payload.price, &payload.bulk_packs)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    if Products::find_by_id(payload.id.clone())
        .one(&state.orm)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(format!(
            "product {} already exists",
            payload.id
        )));
    }

    let now = Utc::now();
    let product = ActiveModel {
        id: Set(payload.id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        category: Set(payload.category),
        product_type: Set(payload.product_type.as_str().to_string()),
        image_url: Set(payload.image_url),
        in_stock: Set(payload.in_stock.unwrap_or(true)),
        bulk_packs: Set(packs_to_json(&payload.bulk_packs)?),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        &product.id,
        serde_json::json!({ "price": product.price }),
    )
    .await;

    Ok(ApiResponse::ok("Product created", product_from_entity(product)?))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(state, user).await?;
    let existing = Products::find_by_id(id.to_string())
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = product_from_entity(existing.clone())?;
    let price = payload.price.unwrap_or(current.price);
    let packs = payload.bulk_packs.unwrap_or(current.bulk_packs);
    validate_pricing(price, &packs)?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(product_type) = payload.product_type {
        active.product_type = Set(product_type.as_str().to_string());
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(in_stock) = payload.in_stock {
        active.in_stock = Set(in_stock);
    }
    active.price = Set(price);
    active.bulk_packs = Set(packs_to_json(&packs)?);
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        &product.id,
        serde_json::json!({ "price": product.price }),
    )
    .await;

    Ok(ApiResponse::ok("Updated", product_from_entity(product)?))
}

/// Products referenced by any order line stay in the catalog.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(state, user).await?;

    let referenced = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if referenced > 0 {
        return Err(AppError::BadRequest(format!(
            "product {id} appears in {referenced} order lines; mark it out of stock instead"
        )));
    }

    let result = Products::delete_by_id(id.to_string())
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        id,
        serde_json::json!({}),
    )
    .await;

    Ok(ApiResponse::ok("Deleted", serde_json::json!({})))
}

fn packs_to_json(packs: &[BulkPack]) -> AppResult<serde_json::Value> {
    let packs: Vec<BulkPack> = packs
        .iter()
        .map(|p| BulkPack {
            size: p.size.trim().to_string(),
            price: p.price,
        })
        .collect();
    serde_json::to_value(packs).map_err(|e| AppError::Internal(e.into()))
}

pub(crate) fn product_from_entity(model: ProductModel) -> AppResult<Product> {
    let product_type = model
        .product_type
        .parse::<ProductType>()
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    let bulk_packs: Vec<BulkPack> =
        serde_json::from_value(model.bulk_packs).map_err(|e| AppError::Internal(e.into()))?;

    Ok(Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        category: model.category,
        product_type,
        image_url: model.image_url,
        in_stock: model.in_stock,
        bulk_packs,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
