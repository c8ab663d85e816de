use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh::generate_refresh_token;
use crate::auth::repo::User;
use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.chars().count() > 25 {
        return Err(AppError::Validation {
            field: "username",
            message: "Username must be 1-25 characters",
        });
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        return Err(AppError::Validation {
            field: "email",
            message: "Invalid email address",
        });
    }
    Ok(())
}

/// Password policy: at least 6 characters, containing a letter and a digit.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    let long_enough = password.len() >= 6;
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(long_enough && has_letter && has_digit) {
        return Err(AppError::Validation {
            field: "password",
            message: "Password must be at least 6 characters with a letter and a digit",
        });
    }
    Ok(())
}

pub async fn register(
    db: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)?;

    let hash = hash_password(password)?;
    let user = User::create(db, username, email, &hash).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue a fresh access/refresh pair and persist the refresh token against
/// the user, invalidating any previous one.
async fn issue_tokens(db: &PgPool, keys: &JwtKeys, user: &User) -> Result<IssuedTokens, AppError> {
    let access_token = keys.sign_access(user)?;
    let refresh_token = generate_refresh_token();
    User::store_refresh_token(db, user.id, &refresh_token, keys.refresh_expiry()).await?;
    Ok(IssuedTokens {
        access_token,
        refresh_token,
    })
}

/// Login with username or email. Unknown identifier and wrong password
/// collapse to the same error so callers cannot enumerate accounts.
pub async fn login(
    db: &PgPool,
    keys: &JwtKeys,
    identifier: &str,
    password: &str,
) -> Result<(User, IssuedTokens), AppError> {
    let user = User::find_by_identifier(db, identifier)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let tokens = issue_tokens(db, keys, &user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, tokens))
}

/// Rotate the refresh token and re-issue the pair. The stored value swaps
/// atomically; presenting a consumed or expired token fails.
pub async fn refresh(
    db: &PgPool,
    keys: &JwtKeys,
    user_id: Uuid,
    presented: &str,
) -> Result<(User, IssuedTokens), AppError> {
    let new_token = generate_refresh_token();
    let user = User::rotate_refresh_token(db, user_id, presented, &new_token, keys.refresh_expiry())
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "refresh rejected");
            AppError::InvalidRefreshToken
        })?;

    let access_token = keys.sign_access(&user)?;
    info!(user_id = %user.id, "session refreshed");
    Ok((
        user,
        IssuedTokens {
            access_token,
            refresh_token: new_token,
        },
    ))
}

/// Change the caller's own password. The old password must verify.
pub async fn change_password(
    db: &PgPool,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !verify_password(old_password, &user.password_hash)? {
        warn!(user_id = %user_id, "password change with wrong old password");
        return Err(AppError::InvalidCredentials);
    }

    validate_password(new_password)?;
    let hash = hash_password(new_password)?;
    User::set_password_hash(db, user_id, &hash).await?;
    info!(user_id = %user_id, "password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("alice@x"));
        assert!(!is_valid_email("al ice@x.com"));
    }

    #[test]
    fn username_length_is_bounded() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username(&"a".repeat(25)).is_ok());
        assert!(validate_username(&"a".repeat(26)).is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn username_length_counts_characters_not_bytes() {
        // 20 characters, 60 bytes
        assert!(validate_username(&"日".repeat(20)).is_ok());
        assert!(validate_username(&"日".repeat(25)).is_ok());
        assert!(validate_username(&"日".repeat(26)).is_err());
    }

    #[test]
    fn password_policy_requires_letter_and_digit() {
        assert!(validate_password("Passw0rd").is_ok());
        assert!(validate_password("abc123").is_ok());
        assert!(validate_password("a1b2c").is_err()); // too short
        assert!(validate_password("abcdef").is_err()); // no digit
        assert!(validate_password("123456").is_err()); // no letter
    }
}
