use sqlx::PgPool;
use uuid::Uuid;

/// An audit log entry to record.
pub struct AuditEntry {
    pub school_id: Option<Uuid>,
    pub user_id: Uuid,
    pub action: &'static str,
    pub resource_type: &'static str,
    pub resource_id: Uuid,
}

/// Fire-and-forget audit log entry. Never blocks the handler; failures are
/// only logged.
pub fn log(pool: PgPool, entry: AuditEntry) {
    tokio::spawn(async move {
        let res = sqlx::query(
            "INSERT INTO audit_log (school_id, user_id, action, resource_type, resource_id)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.school_id)
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.resource_type)
        .bind(entry.resource_id)
        .execute(&pool)
        .await;

        if let Err(e) = res {
            tracing::warn!("audit log insert failed for {}: {e}", entry.action);
        }
    });
}
