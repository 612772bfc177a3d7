use std::fmt::Display;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel as AuditActive, error::AppResult};

pub async fn log_audit<C: ConnectionTrait>(
    conn: &C,
    actor_id: Option<Uuid>,
    action: &str,
    resource: &str,
    resource_id: &str,
    metadata: Value,
) -> AppResult<()> {
    AuditActive {
        id: Set(Uuid::new_v4()),
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        resource: Set(resource.to_string()),
        resource_id: Set(resource_id.to_string()),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Audit writes never fail the request that triggered them.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    actor_id: Option<Uuid>,
    action: &str,
    resource: &str,
    resource_id: impl Display,
    metadata: Value,
) {
    let resource_id = resource_id.to_string();
    if let Err(err) = log_audit(conn, actor_id, action, resource, &resource_id, metadata).await {
        tracing::warn!(error = %err, action, resource, %resource_id, "audit log failed");
    }
}
