//! HTTP handlers for mockup and modification requests

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::page_for;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{MockupRequest, ModificationRequest, Page, PageParams, ReturnDesignInput};
use crate::services::mockup::{
    CreateMockupInput, CreateModificationInput, MockupService, RequestFilter,
};
use crate::AppState;

// ============================================================================
// Mockup requests
// ============================================================================

/// List mockup requests
pub async fn list_mockups(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<PageParams>,
    Query(filter): Query<RequestFilter>,
) -> AppResult<Json<Page<MockupRequest>>> {
    let service = MockupService::new(state.db);
    let (mockups, count) = service.list_mockups(&filter, params).await?;
    Ok(Json(page_for(mockups, count, params, &uri)))
}

/// Get a mockup request
pub async fn get_mockup(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(mockup_id): Path<Uuid>,
) -> AppResult<Json<MockupRequest>> {
    let service = MockupService::new(state.db);
    Ok(Json(service.get_mockup(mockup_id).await?))
}

/// Create a mockup request
pub async fn create_mockup(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMockupInput>,
) -> AppResult<(StatusCode, Json<MockupRequest>)> {
    let service = MockupService::new(state.db);
    let mockup = service.create_mockup(&current_user.0.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(mockup)))
}

/// Designer starts a mockup request
pub async fn start_mockup(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(mockup_id): Path<Uuid>,
) -> AppResult<Json<MockupRequest>> {
    let service = MockupService::new(state.db);
    let mockup = service.start_mockup(&current_user.0.actor(), mockup_id).await?;
    Ok(Json(mockup))
}

/// Designer returns a mockup request
pub async fn return_mockup(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(mockup_id): Path<Uuid>,
    Json(input): Json<ReturnDesignInput>,
) -> AppResult<Json<MockupRequest>> {
    let service = MockupService::new(state.db);
    let mockup = service
        .return_mockup(&current_user.0.actor(), mockup_id, input)
        .await?;
    Ok(Json(mockup))
}

// ============================================================================
// Modification requests
// ============================================================================

/// List modification requests
pub async fn list_modifications(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<PageParams>,
    Query(filter): Query<RequestFilter>,
) -> AppResult<Json<Page<ModificationRequest>>> {
    let service = MockupService::new(state.db);
    let (modifications, count) = service.list_modifications(&filter, params).await?;
    Ok(Json(page_for(modifications, count, params, &uri)))
}

/// Get a modification request
pub async fn get_modification(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(modification_id): Path<Uuid>,
) -> AppResult<Json<ModificationRequest>> {
    let service = MockupService::new(state.db);
    Ok(Json(service.get_modification(modification_id).await?))
}

/// Create a modification request
pub async fn create_modification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateModificationInput>,
) -> AppResult<(StatusCode, Json<ModificationRequest>)> {
    let service = MockupService::new(state.db);
    let modification = service
        .create_modification(&current_user.0.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(modification)))
}

/// Designer starts a modification request
pub async fn start_modification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(modification_id): Path<Uuid>,
) -> AppResult<Json<ModificationRequest>> {
    let service = MockupService::new(state.db);
    let modification = service
        .start_modification(&current_user.0.actor(), modification_id)
        .await?;
    Ok(Json(modification))
}

/// Designer returns a modification request
pub async fn return_modification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(modification_id): Path<Uuid>,
    Json(input): Json<ReturnDesignInput>,
) -> AppResult<Json<ModificationRequest>> {
    let service = MockupService::new(state.db);
    let modification = service
        .return_modification(&current_user.0.actor(), modification_id, input)
        .await?;
    Ok(Json(modification))
}

/// Revision history of a modification, newest first
pub async fn get_revision_chain(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(modification_id): Path<Uuid>,
) -> AppResult<Json<Vec<ModificationRequest>>> {
    let service = MockupService::new(state.db);
    Ok(Json(service.revision_chain(modification_id).await?))
}
