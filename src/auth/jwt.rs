use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::repo::{Role, User};
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Access-token payload. The subject claim is the sole authority for
/// "current user" on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            access_ttl_minutes,
            refresh_ttl_days,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_days as u64) * 24 * 60 * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign_access(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "access token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "access token verified");
        Ok(data.claims)
    }

    pub fn refresh_expiry(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + TimeDuration::seconds(self.refresh_ttl.as_secs() as i64)
    }
}

fn bearer_claims(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let keys = JwtKeys::from_ref(state);
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthenticated)?;

    keys.verify(token).map_err(|_| {
        warn!("invalid or expired access token");
        AppError::Unauthenticated
    })
}

/// Extracts the authenticated user id from the bearer access token. Every
/// service call downstream takes this id explicitly; nothing re-derives the
/// principal deeper in the stack.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        Ok(AuthUser(claims.sub))
    }
}

/// Like [`AuthUser`] but additionally requires the Admin role.
pub struct AdminUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.role != Role::Admin {
            warn!(user_id = %claims.sub, "admin operation attempted without admin role");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn fake_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "hash".into(),
            role,
            first_name: None,
            last_name: None,
            address: None,
            refresh_token: None,
            refresh_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn make_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    fn parts_with_bearer(token: &str) -> Parts {
        let req = axum::http::Request::builder()
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(())
            .expect("request");
        req.into_parts().0
    }

    #[tokio::test]
    async fn sign_and_verify_carries_identity_claims() {
        let keys = make_keys();
        let user = fake_user(Role::User);
        let token = keys.sign_access(&user).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@x.com");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn verify_rejects_wrong_audience() {
        let keys = make_keys();
        let user = fake_user(Role::User);
        let token = keys.sign_access(&user).expect("sign access");

        let mut other = make_keys();
        other.audience = "someone-else".into();
        assert!(other.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign_access(&fake_user(Role::User)).expect("sign");
        let mut tampered = token.clone();
        tampered.pop();
        assert!(keys.verify(&tampered).is_err());
    }

    #[tokio::test]
    async fn auth_user_extracts_subject() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user = fake_user(Role::User);
        let token = keys.sign_access(&user).expect("sign");
        let mut parts = parts_with_bearer(&token);

        let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(id, user.id);
    }

    #[tokio::test]
    async fn admin_extractor_rejects_user_role() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access(&fake_user(Role::User)).expect("sign");
        let mut parts = parts_with_bearer(&token);

        let err = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("rejection");
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn admin_extractor_accepts_admin_role() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let admin = fake_user(Role::Admin);
        let token = keys.sign_access(&admin).expect("sign");
        let mut parts = parts_with_bearer(&token);

        let AdminUser(id) = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extract");
        assert_eq!(id, admin.id);
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let state = AppState::fake();
        let req = axum::http::Request::builder().body(()).expect("request");
        let mut parts = req.into_parts().0;
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .expect("rejection");
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
