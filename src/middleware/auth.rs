use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    services::auth_service::has_role,
    state::AppState,
};

pub const ADMIN_ROLE: &str = "admin";

/// Caller identity taken from a bearer token minted by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

pub async fn ensure_role(state: &AppState, user: &AuthUser, role: &str) -> AppResult<()> {
    if !has_role(&state.pool, user.user_id, role).await? {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub async fn ensure_admin(state: &AppState, user: &AuthUser) -> AppResult<()> {
    ensure_role(state, user, ADMIN_ROLE).await
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<AuthUser> {
    let mut validation = Validation::default();
    // identity provider tokens carry an audience we do not pin
    validation.validate_aud = false;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        email: decoded.claims.email,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        decode_token(token, &state.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use testresult::TestResult;

    use super::*;

    fn token(sub: &str, secret: &str, exp_in: Duration) -> TestResult<String> {
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("asha@example.com".into()),
            role: Some("authenticated".into()),
            exp: (Utc::now() + exp_in).timestamp() as usize,
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?)
    }

    #[test]
    fn valid_token_yields_user() -> TestResult {
        let id = Uuid::new_v4();
        let user = decode_token(&token(&id.to_string(), "s3cret", Duration::hours(1))?, "s3cret")?;

        assert_eq!(user.user_id, id);
        assert_eq!(user.email.as_deref(), Some("asha@example.com"));
        Ok(())
    }

    #[test]
    fn wrong_secret_expired_or_bad_subject_rejected() -> TestResult {
        let id = Uuid::new_v4().to_string();

        let wrong = decode_token(&token(&id, "s3cret", Duration::hours(1))?, "other");
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        let expired = decode_token(&token(&id, "s3cret", Duration::hours(-2))?, "s3cret");
        assert!(matches!(expired, Err(AppError::Unauthorized(_))));

        let not_uuid = decode_token(&token("anon", "s3cret", Duration::hours(1))?, "s3cret");
        assert!(matches!(not_uuid, Err(AppError::Unauthorized(_))));
        Ok(())
    }

    #[test]
    fn locally_issued_tokens_decode() -> TestResult {
        let id = Uuid::new_v4();
        let token = crate::services::auth_service::issue_token(
            "s3cret",
            id,
            Some("staff@example.com"),
            Duration::minutes(5),
        )?;

        let user = decode_token(&token, "s3cret")?;
        assert_eq!(user.user_id, id);
        Ok(())
    }
}
