use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo::{Role, User};

pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    address: Option<&str>,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            address = COALESCE($4, address)
        WHERE id = $1
        RETURNING id, username, email, password_hash, role, first_name, last_name, address,
                  refresh_token, refresh_token_expires_at, created_at
        "#,
    )
    .bind(user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(address)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, role, first_name, last_name, address,
               refresh_token, refresh_token_expires_at, created_at
        FROM users
        ORDER BY created_at
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(users)
}

pub async fn admin_update(
    db: &PgPool,
    user_id: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    address: Option<&str>,
    role: Option<Role>,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            address = COALESCE($4, address),
            role = COALESCE($5, role)
        WHERE id = $1
        RETURNING id, username, email, password_hash, role, first_name, last_name, address,
                  refresh_token, refresh_token_expires_at, created_at
        "#,
    )
    .bind(user_id)
    .bind(first_name)
    .bind(last_name)
    .bind(address)
    .bind(role)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn delete(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
