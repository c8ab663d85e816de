use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    reports::repo::{self, Dashboard, SalesRow},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/dashboard", get(get_dashboard))
        .route("/reports/sales", get(get_sales_rows))
}

#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Dashboard>, AppError> {
    let dashboard = repo::dashboard(&state.db, user_id).await?;
    Ok(Json(dashboard))
}

#[instrument(skip(state))]
pub async fn get_sales_rows(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<SalesRow>>, AppError> {
    let rows = repo::sales_rows(&state.db, user_id).await?;
    Ok(Json(rows))
}
