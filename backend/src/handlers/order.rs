//! HTTP handlers for orders, their BOM and cutting files

use axum::{
    extract::{Multipart, OriginalUri, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{order_code_param, page_for};
use super::upload::MultipartForm;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{DxfFile, Order, Page, PageParams};
use crate::services::order::{
    AdvanceInput, BomInput, CreateOrderInput, DxfReadyResponse, OrderFilter, OrderService,
    OrderView,
};
use crate::AppState;

/// List orders
pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<PageParams>,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Page<OrderView>>> {
    let service = OrderService::new(state.db);
    let (orders, count) = service.list_orders(&filter, params).await?;
    Ok(Json(page_for(orders, count, params, &uri)))
}

/// Get an order by its code
pub async fn get_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_code): Path<String>,
) -> AppResult<Json<OrderView>> {
    let order_code = order_code_param(order_code)?;
    let service = OrderService::new(state.db);
    Ok(Json(service.get_order(&order_code).await?))
}

/// Create an order from a returned mockup or modification
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderView>)> {
    let service = OrderService::new(state.db);
    let order = service.create_order(&current_user.0.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Attach the first BOM
pub async fn fill_bom(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_code): Path<String>,
    Json(input): Json<BomInput>,
) -> AppResult<Json<Order>> {
    let order_code = order_code_param(order_code)?;
    let service = OrderService::new(state.db);
    let order = service
        .fill_bom(&current_user.0.actor(), &order_code, input)
        .await?;
    Ok(Json(order))
}

/// Replace the whole BOM
pub async fn edit_bom(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_code): Path<String>,
    Json(input): Json<BomInput>,
) -> AppResult<Json<Order>> {
    let order_code = order_code_param(order_code)?;
    let service = OrderService::new(state.db);
    let order = service
        .edit_bom(&current_user.0.actor(), &order_code, input)
        .await?;
    Ok(Json(order))
}

/// Move the order to its next stage
pub async fn advance_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_code): Path<String>,
    input: Option<Json<AdvanceInput>>,
) -> AppResult<Json<OrderView>> {
    let order_code = order_code_param(order_code)?;
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let service = OrderService::new(state.db);
    let order = service
        .advance(&current_user.0.actor(), &order_code, input)
        .await?;
    Ok(Json(order))
}

/// Upload a DXF file; the multipart part must be named `file`
pub async fn upload_dxf(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_code): Path<String>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DxfFile>)> {
    let order_code = order_code_param(order_code)?;
    let mut form = MultipartForm::read(multipart).await?;
    let upload = form
        .take_file("file")
        .ok_or_else(|| AppError::validation("file", "a DXF file is required"))?;

    let service = OrderService::new(state.db.clone());
    let file = service
        .upload_dxf(&current_user.0.actor(), &state.storage, &order_code, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

/// Delete a DXF file
pub async fn delete_dxf(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((order_code, file_id)): Path<(String, Uuid)>,
) -> AppResult<Json<Order>> {
    let order_code = order_code_param(order_code)?;
    let service = OrderService::new(state.db.clone());
    let order = service
        .delete_dxf(&current_user.0.actor(), &state.storage, &order_code, file_id)
        .await?;
    Ok(Json(order))
}

/// Flip the order's `dxf_ready` flag
pub async fn toggle_dxf_ready(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_code): Path<String>,
) -> AppResult<Json<DxfReadyResponse>> {
    let order_code = order_code_param(order_code)?;
    let service = OrderService::new(state.db);
    let response = service
        .toggle_dxf_ready(&current_user.0.actor(), &order_code)
        .await?;
    Ok(Json(response))
}
