use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    components::{dto::ComponentResponse, repo as components_repo},
    error::AppError,
    inventory::repo,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/inventory", get(get_inventory))
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub id: Uuid,
    pub total_value: i64,
    pub components: Vec<ComponentResponse>,
}

#[instrument(skip(state))]
pub async fn get_inventory(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<InventoryResponse>, AppError> {
    let inventory = repo::get_or_create(&state.db, user_id).await?;
    let components = components_repo::list_by_inventory(&state.db, inventory.id).await?;
    let total_value = repo::total_value(&state.db, inventory.id).await?;
    Ok(Json(InventoryResponse {
        id: inventory.id,
        total_value,
        components: components.into_iter().map(ComponentResponse::from).collect(),
    }))
}
