use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the migrations embedded from ./migrations/
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Delete every row of application data, children before parents, in one
/// transaction. The schema and migration history are kept.
pub async fn clear_all(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for table in [
        "audit_log",
        "transfers",
        "scheduled_lessons",
        "lessons",
        "admissions",
        "terms",
        "schools",
        "users",
    ] {
        let res = sqlx::query(&format!("DELETE FROM {table}")).execute(&mut *tx).await?;
        tracing::info!("Cleared {} row(s) from {table}", res.rows_affected());
    }
    tx.commit().await?;
    Ok(())
}
