//! HTTP handlers for the material catalog

use axum::{
    extract::{OriginalUri, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::page_for;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{Account, Material, Page, PageParams};
use crate::services::material::{MaterialFilter, MaterialService, SyncReport};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub invoice: bool,
}

/// List materials
pub async fn list_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<PageParams>,
    Query(filter): Query<MaterialFilter>,
) -> AppResult<Json<Page<Material>>> {
    let service = MaterialService::new(state.db);
    let (materials, count) = service.list_materials(&filter, params).await?;
    Ok(Json(page_for(materials, count, params, &uri)))
}

/// Get a material
pub async fn get_material(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Material>> {
    let service = MaterialService::new(state.db);
    Ok(Json(service.get_material(material_id).await?))
}

/// List payment accounts; `?invoice=true` keeps invoice-eligible accounts only
pub async fn list_accounts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<AccountQuery>,
) -> AppResult<Json<Vec<Account>>> {
    let service = MaterialService::new(state.db);
    let accounts = service.list_accounts(query.invoice).await?;
    Ok(Json(accounts))
}

/// Import materials and accounts from the upstream data service
pub async fn sync_catalog(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SyncReport>> {
    let client = state
        .data_service
        .as_ref()
        .ok_or_else(|| AppError::Configuration("upstream data service is not configured".into()))?;

    let service = MaterialService::new(state.db.clone());
    let report = service.sync_catalog(&current_user.0.actor(), client).await?;
    Ok(Json(report))
}
