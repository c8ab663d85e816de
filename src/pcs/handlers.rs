use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    components::{dto::ComponentResponse, repo as components_repo},
    error::AppError,
    pcs::{
        dto::{ImageResponse, PcDetails, PcRequest, PcResponse, StatusChangeRequest},
        repo, services, vat,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pcs", post(create_pc).get(list_pcs))
        .route("/pcs/:id", get(get_pc).put(update_pc).delete(delete_pc))
        .route(
            "/pcs/:id/components/:component_id",
            post(attach_component).delete(detach_component),
        )
        .route("/pcs/:id/status", post(change_status))
        .route("/pcs/:id/vat", post(recompute_vat))
        .route("/pcs/:id/image", put(upload_image))
}

fn validate(payload: &PcRequest) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation {
            field: "name",
            message: "Name must not be empty",
        });
    }
    if payload.list_price.is_some_and(|p| p < 0) {
        return Err(AppError::Validation {
            field: "list_price",
            message: "List price must be non-negative",
        });
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn create_pc(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<PcRequest>,
) -> Result<(StatusCode, Json<PcResponse>), AppError> {
    validate(&payload)?;
    let pc = repo::create(
        &state.db,
        user_id,
        &payload.name,
        payload.description.as_deref(),
        payload.list_price,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(pc.into())))
}

#[instrument(skip(state))]
pub async fn list_pcs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PcResponse>>, AppError> {
    let pcs = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(pcs.into_iter().map(PcResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_pc(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PcDetails>, AppError> {
    let pc = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let components = components_repo::list_by_pc(&state.db, pc.id).await?;
    let components_total = repo::components_total(&state.db, pc.id).await?;
    Ok(Json(PcDetails {
        pc: pc.into(),
        components: components.into_iter().map(ComponentResponse::from).collect(),
        components_total,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_pc(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PcRequest>,
) -> Result<Json<PcResponse>, AppError> {
    validate(&payload)?;
    let current = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    services::validate_price_change(current.status, payload.list_price)?;
    let pc = repo::update(
        &state.db,
        user_id,
        id,
        &payload.name,
        payload.description.as_deref(),
        payload.list_price,
    )
    .await?
    .ok_or(AppError::NotFound)?;
    Ok(Json(pc.into()))
}

#[instrument(skip(state))]
pub async fn delete_pc(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    repo::delete(&state.db, user_id, id).await?;
    info!(user_id = %user_id, pc_id = %id, "build deleted, components returned to inventory");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn attach_component(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, component_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    repo::attach_component(&state.db, user_id, id, component_id).await?;
    info!(user_id = %user_id, pc_id = %id, component_id = %component_id, "component attached");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn detach_component(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, component_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    repo::detach_component(&state.db, user_id, id, component_id).await?;
    info!(user_id = %user_id, pc_id = %id, component_id = %component_id, "component detached");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn change_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChangeRequest>,
) -> Result<Json<PcResponse>, AppError> {
    let pc = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let change = services::plan_transition(&pc, &payload, OffsetDateTime::now_utc())?;
    let pc = repo::apply_status(&state.db, user_id, id, &change)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id = %user_id, pc_id = %id, status = ?change.status, "build status changed");
    Ok(Json(pc.into()))
}

/// Recompute the VAT snapshot from current component prices and the sale
/// (or asking) price, then clear the stale flag.
#[instrument(skip(state))]
pub async fn recompute_vat(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PcResponse>, AppError> {
    let pc = repo::get(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let components_total = repo::components_total(&state.db, pc.id).await?;
    let gross = pc.sale_price.or(pc.list_price);
    let breakdown = vat::compute(components_total, gross, state.config.vat_rate_percent);

    let pc = repo::set_vat(&state.db, user_id, id, breakdown.deductible, breakdown.outgoing)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id = %user_id, pc_id = %id, "vat recomputed");
    Ok(Json(pc.into()))
}

#[instrument(skip(state, body))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImageResponse>, AppError> {
    if body.is_empty() {
        return Err(AppError::Validation {
            field: "body",
            message: "Image body must not be empty",
        });
    }
    // ownership check before touching the image host
    repo::get(&state.db, user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let key = format!("pc-images/{}/{}", user_id, id);
    state
        .storage
        .put_object(&key, body, content_type)
        .await
        .map_err(AppError::Internal)?;
    let url = state.storage.public_url(&key);

    repo::set_image_url(&state.db, user_id, id, &url)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id = %user_id, pc_id = %id, "build image uploaded");
    Ok(Json(ImageResponse { image_url: url }))
}
