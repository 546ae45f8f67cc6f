//! HTTP handlers for order containers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::upload::MultipartForm;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::OrderContainer;
use crate::services::container::{
    ContainerService, CreateContainerInput, PaymentEvidence, UpdatePaymentInput,
};
use crate::AppState;

/// Create a container
///
/// Multipart body: a `payload` JSON part, plus optional `payment_screenshot`
/// and `invoice_image` files.
pub async fn create_container(
    State(state): State<AppState>,
    current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<OrderContainer>)> {
    let mut form = MultipartForm::read(multipart).await?;
    let input: CreateContainerInput = form.json("payload")?;
    let evidence = PaymentEvidence {
        payment_screenshot: form.take_file("payment_screenshot"),
        invoice_image: form.take_file("invoice_image"),
    };

    let service = ContainerService::new(state.db.clone(), state.config.payment.default_advance_ratio);
    let container = service
        .create_container(&current_user.0.actor(), &state.storage, input, evidence)
        .await?;
    Ok((StatusCode::CREATED, Json(container)))
}

/// Get a container
pub async fn get_container(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(container_id): Path<Uuid>,
) -> AppResult<Json<OrderContainer>> {
    let service = ContainerService::new(state.db.clone(), state.config.payment.default_advance_ratio);
    Ok(Json(service.get_container(container_id).await?))
}

/// Change a container's full payment
pub async fn update_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(container_id): Path<Uuid>,
    Json(input): Json<UpdatePaymentInput>,
) -> AppResult<Json<OrderContainer>> {
    let service = ContainerService::new(state.db.clone(), state.config.payment.default_advance_ratio);
    let container = service
        .update_payment(&current_user.0.actor(), container_id, input)
        .await?;
    Ok(Json(container))
}
