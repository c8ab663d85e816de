use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    components::{
        dto::{ComponentRequest, ComponentResponse},
        repo::{self, ComponentFields},
    },
    error::AppError,
    inventory,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/components", post(create_component).get(list_components))
        .route(
            "/components/:id",
            get(get_component)
                .put(update_component)
                .delete(delete_component),
        )
}

fn validate(payload: &ComponentRequest) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation {
            field: "name",
            message: "Name must not be empty",
        });
    }
    if payload.price < 0 {
        return Err(AppError::Validation {
            field: "price",
            message: "Price must be non-negative",
        });
    }
    Ok(())
}

fn fields_of(payload: &ComponentRequest) -> ComponentFields<'_> {
    ComponentFields {
        name: &payload.name,
        price: payload.price,
        manufacturer: &payload.manufacturer,
        kind: payload.kind,
        condition: payload.condition,
        store: payload.store.as_deref(),
    }
}

#[instrument(skip(state, payload))]
pub async fn create_component(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ComponentRequest>,
) -> Result<(StatusCode, Json<ComponentResponse>), AppError> {
    validate(&payload)?;
    let inventory = inventory::repo::get_or_create(&state.db, user_id).await?;
    let component = repo::create(&state.db, user_id, inventory.id, &fields_of(&payload)).await?;
    Ok((StatusCode::CREATED, Json(component.into())))
}

#[instrument(skip(state))]
pub async fn list_components(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ComponentResponse>>, AppError> {
    let components = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(
        components.into_iter().map(ComponentResponse::from).collect(),
    ))
}

#[instrument(skip(state))]
pub async fn get_component(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ComponentResponse>, AppError> {
    let component = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(component.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_component(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ComponentRequest>,
) -> Result<Json<ComponentResponse>, AppError> {
    validate(&payload)?;
    let component = repo::update(&state.db, user_id, id, &fields_of(&payload))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(component.into()))
}

#[instrument(skip(state))]
pub async fn delete_component(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = repo::delete(&state.db, user_id, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
