use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims issued by the identity provider.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleCheck {
    pub role: String,
    pub granted: bool,
}
