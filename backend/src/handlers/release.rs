//! HTTP handlers for releases

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::page_for;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{Page, PageParams, Release, ReleaseFilter};
use crate::services::release::{ConfirmOrderReleases, CreateReleaseInput, ReleaseService};
use crate::AppState;

/// List releases
pub async fn list_releases(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<PageParams>,
    Query(filter): Query<ReleaseFilter>,
) -> AppResult<Json<Page<Release>>> {
    let service = ReleaseService::new(state.db);
    let (releases, count) = service.list_releases(&filter, params).await?;
    Ok(Json(page_for(releases, count, params, &uri)))
}

/// Get a release
pub async fn get_release(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(release_id): Path<Uuid>,
) -> AppResult<Json<Release>> {
    let service = ReleaseService::new(state.db);
    Ok(Json(service.get_release(release_id).await?))
}

/// Record a release
pub async fn create_release(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateReleaseInput>,
) -> AppResult<(StatusCode, Json<Release>)> {
    let service = ReleaseService::new(state.db);
    let release = service.create_release(&current_user.0.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(release)))
}

/// Confirm one release
pub async fn confirm_release(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(release_id): Path<Uuid>,
) -> AppResult<Json<Release>> {
    let service = ReleaseService::new(state.db);
    let release = service
        .confirm_release(&current_user.0.actor(), release_id)
        .await?;
    Ok(Json(release))
}

/// Confirm every pending additional release of an order
pub async fn confirm_order_releases(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_code): Path<String>,
) -> AppResult<Json<ConfirmOrderReleases>> {
    let order_code = super::order_code_param(order_code)?;
    let service = ReleaseService::new(state.db);
    let outcome = service
        .confirm_order_releases(&current_user.0.actor(), &order_code)
        .await?;
    Ok(Json(outcome))
}
