use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::auth::{Claims, RoleCheck},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
};

/// Role check backing the staff console gate.
pub async fn has_role(pool: &DbPool, user_id: Uuid, role: &str) -> AppResult<bool> {
    let granted: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = $2)",
    )
    .bind(user_id)
    .bind(role)
    .fetch_one(pool)
    .await?;
    Ok(granted.0)
}

pub async fn grant_role(pool: &DbPool, user_id: Uuid, role: &str) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_roles (id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, role) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn check_role(
    pool: &DbPool,
    user: &AuthUser,
    role: &str,
) -> AppResult<ApiResponse<RoleCheck>> {
    let granted = has_role(pool, user.user_id, role).await?;
    Ok(ApiResponse::ok(
        "OK",
        RoleCheck {
            role: role.to_string(),
            granted,
        },
    ))
}

/// Mints a token the way the identity provider does; used for local
/// development and tests.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    email: Option<&str>,
    ttl: Duration,
) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        role: Some("authenticated".to_string()),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}
