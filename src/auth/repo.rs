use crate::error::AppError;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed role set, persisted by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
pub enum Role {
    User = 0,
    Admin = 1,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "User" => Some(Role::User),
            "Admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Find a user by username or email. Matching is case-sensitive.
    pub async fn find_by_identifier(db: &PgPool, identifier: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, first_name, last_name, address,
                   refresh_token, refresh_token_expires_at, created_at
            FROM users
            WHERE username = $1 OR email = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, role, first_name, last_name, address,
                   refresh_token, refresh_token_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with a hashed password. Uniqueness violations map to
    /// a field-specific Conflict.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, role, first_name, last_name, address,
                      refresh_token, refresh_token_expires_at, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(e) => {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.code().as_deref() == Some("23505") {
                        let constraint = db_err.constraint().unwrap_or_default();
                        if constraint.contains("email") {
                            return Err(AppError::Conflict {
                                reason: "email_taken",
                                message: "Email already registered",
                            });
                        }
                        return Err(AppError::Conflict {
                            reason: "username_taken",
                            message: "Username already taken",
                        });
                    }
                }
                Err(e.into())
            }
        }
    }

    /// Overwrite the stored refresh token. Any prior token for the user is
    /// invalidated.
    pub async fn store_refresh_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2, refresh_token_expires_at = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Guarded rotation: the swap only happens when the presented token still
    /// matches the stored value and has not expired. Of two concurrent calls
    /// presenting the same stale token, at most one gets a row back.
    pub async fn rotate_refresh_token(
        db: &PgPool,
        user_id: Uuid,
        presented: &str,
        new_token: &str,
        new_expires_at: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET refresh_token = $3, refresh_token_expires_at = $4
            WHERE id = $1
              AND refresh_token = $2
              AND refresh_token_expires_at > now()
            RETURNING id, username, email, password_hash, role, first_name, last_name, address,
                      refresh_token, refresh_token_expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(presented)
        .bind(new_token)
        .bind(new_expires_at)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn clear_refresh_token(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = NULL, refresh_token_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Replace the password hash and drop any active refresh token, forcing
    /// other sessions to log in again.
    pub async fn set_password_hash(
        db: &PgPool,
        user_id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, refresh_token = NULL, refresh_token_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordinals_are_stable() {
        assert_eq!(Role::User as i16, 0);
        assert_eq!(Role::Admin as i16, 1);
    }

    #[test]
    fn role_names_form_a_closed_set() {
        assert_eq!(Role::from_name("User"), Some(Role::User));
        assert_eq!(Role::from_name("Admin"), Some(Role::Admin));
        assert_eq!(Role::from_name("admin"), None);
        assert_eq!(Role::from_name("SuperUser"), None);
    }

    #[test]
    fn role_serializes_by_name() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
        let parsed: Role = serde_json::from_str("\"User\"").unwrap();
        assert_eq!(parsed, Role::User);
    }
}
