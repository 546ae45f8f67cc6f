//! HTTP handlers for sales and maintenance jobs

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{Maintenance, Sale};
use crate::services::stock::{
    CreateMaintenanceInput, CreateSaleInput, StockService, WithReleases,
};
use crate::AppState;

/// Record a direct sale
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<WithReleases<Sale>>)> {
    let service = StockService::new(state.db);
    let sale = service.create_sale(&current_user.0.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Record a maintenance job
pub async fn create_maintenance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMaintenanceInput>,
) -> AppResult<(StatusCode, Json<WithReleases<Maintenance>>)> {
    let service = StockService::new(state.db);
    let maintenance = service
        .create_maintenance(&current_user.0.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(maintenance)))
}
