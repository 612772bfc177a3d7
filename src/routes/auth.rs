use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::auth::RoleCheck,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/roles/{role}", get(check_role))
}

#[utoipa::path(
    get,
    path = "/api/auth/roles/{role}",
    params(
        ("role" = String, Path, description = "Role name, e.g. admin")
    ),
    responses(
        (status = 200, description = "Whether the caller holds the role", body = ApiResponse<RoleCheck>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn check_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(role): Path<String>,
) -> AppResult<Json<ApiResponse<RoleCheck>>> {
    let resp = auth_service::check_role(&state.pool, &user, &role).await?;
    Ok(Json(resp))
}
