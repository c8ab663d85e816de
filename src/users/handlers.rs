use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        jwt::{AdminUser, AuthUser},
        password::hash_password,
        repo::{Role, User},
        services,
    },
    error::AppError,
    state::AppState,
    users::{
        dto::{AdminUpdateUserRequest, ChangePasswordRequest, SetPasswordRequest,
              UpdateProfileRequest},
        repo,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/password", post(change_my_password))
        .route("/users", get(list_users))
        .route("/users/:id", put(admin_update_user).delete(admin_delete_user))
        .route("/users/:id/password", post(admin_set_password))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let user = repo::update_profile(
        &state.db,
        user_id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.address.as_deref(),
    )
    .await?
    .ok_or(AppError::Unauthenticated)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_my_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    services::change_password(
        &state.db,
        user_id,
        &payload.old_password,
        &payload.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- admin operations, gated by the AdminUser extractor ---

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = repo::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn admin_update_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let role = match payload.role.as_deref() {
        None => None,
        Some(name) => Some(Role::from_name(name).ok_or(AppError::Validation {
            field: "role",
            message: "Role must be User or Admin",
        })?),
    };

    let user = repo::admin_update(
        &state.db,
        id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.address.as_deref(),
        role,
    )
    .await?
    .ok_or(AppError::NotFound)?;
    info!(admin_id = %admin_id, user_id = %id, "user updated by admin");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn admin_delete_user(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = repo::delete(&state.db, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    info!(admin_id = %admin_id, user_id = %id, "user deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

/// Admin password reset: no old-password check, but the policy still holds
/// and any active refresh token is dropped.
#[instrument(skip(state, payload))]
pub async fn admin_set_password(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    User::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;

    services::validate_password(&payload.new_password)?;
    let hash = hash_password(&payload.new_password)?;
    User::set_password_hash(&state.db, id, &hash).await?;
    info!(admin_id = %admin_id, user_id = %id, "password reset by admin");
    Ok(StatusCode::NO_CONTENT)
}
