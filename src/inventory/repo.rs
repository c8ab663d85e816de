use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Per-user container for components not assigned to a build. Created
/// lazily on first access; total value is always derived from contents.
#[derive(Debug, Clone, FromRow)]
pub struct Inventory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<Inventory> {
    let mut conn = db.acquire().await?;
    get_or_create_conn(&mut conn, user_id).await
}

pub async fn get_or_create_conn(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> anyhow::Result<Inventory> {
    sqlx::query("INSERT INTO inventories (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let inventory = sqlx::query_as::<_, Inventory>(
        r#"
        SELECT id, user_id, created_at
        FROM inventories
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(inventory)
}

pub async fn total_value(db: &PgPool, inventory_id: Uuid) -> anyhow::Result<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(price), 0)::BIGINT FROM components WHERE inventory_id = $1",
    )
    .bind(inventory_id)
    .fetch_one(db)
    .await?;
    Ok(total)
}
