//! HTTP handlers for sales leads

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::page_for;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{Lead, Page, PageParams};
use crate::services::lead::{CreateLeadInput, LeadFilter, LeadService};
use crate::AppState;

/// List leads
pub async fn list_leads(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<PageParams>,
    Query(filter): Query<LeadFilter>,
) -> AppResult<Json<Page<Lead>>> {
    let service = LeadService::new(state.db);
    let (leads, count) = service.list_leads(&filter, params).await?;
    Ok(Json(page_for(leads, count, params, &uri)))
}

/// Get a lead
pub async fn get_lead(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(lead_id): Path<Uuid>,
) -> AppResult<Json<Lead>> {
    let service = LeadService::new(state.db);
    Ok(Json(service.get_lead(lead_id).await?))
}

/// Create a lead owned by the caller
pub async fn create_lead(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLeadInput>,
) -> AppResult<(StatusCode, Json<Lead>)> {
    let service = LeadService::new(state.db);
    let lead = service.create_lead(&current_user.0.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(lead)))
}
