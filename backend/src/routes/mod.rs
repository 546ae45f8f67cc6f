//! Route definitions for the Sign Production Management platform

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - catalog
        .nest("/materials", material_routes(state.clone()))
        // Protected routes - leads and design requests
        .nest("/leads", lead_routes(state.clone()))
        .nest("/mockups", mockup_routes(state.clone()))
        .nest("/modifications", modification_routes(state.clone()))
        // Protected routes - production orders
        .nest("/orders", order_routes(state.clone()))
        // Protected routes - inventory movements
        .nest("/releases", release_routes(state.clone()))
        .merge(stock_routes(state.clone()))
        // Protected routes - payments
        .nest("/containers", container_routes(state.clone()))
        // Protected routes - uploaded images
        .nest("/attachments", attachment_routes(state))
}

/// Material catalog routes (protected)
fn material_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_materials))
        .route("/accounts", get(handlers::list_accounts))
        .route("/sync", post(handlers::sync_catalog))
        .route("/:material_id", get(handlers::get_material))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Lead routes (protected)
fn lead_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_leads).post(handlers::create_lead))
        .route("/:lead_id", get(handlers::get_lead))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Mockup request routes (protected)
fn mockup_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_mockups).post(handlers::create_mockup))
        .route("/:mockup_id", get(handlers::get_mockup))
        .route("/:mockup_id/start", post(handlers::start_mockup))
        .route("/:mockup_id/return", post(handlers::return_mockup))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Modification request routes (protected)
fn modification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_modifications).post(handlers::create_modification),
        )
        .route("/:modification_id", get(handlers::get_modification))
        .route("/:modification_id/start", post(handlers::start_modification))
        .route("/:modification_id/return", post(handlers::return_modification))
        .route("/:modification_id/chain", get(handlers::get_revision_chain))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order routes (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_code", get(handlers::get_order))
        .route("/:order_code/fillbom", post(handlers::fill_bom))
        .route("/:order_code/editbom", put(handlers::edit_bom))
        .route("/:order_code/advance", post(handlers::advance_order))
        .route("/:order_code/dxf", post(handlers::upload_dxf))
        .route("/:order_code/dxf/ready", post(handlers::toggle_dxf_ready))
        .route("/:order_code/dxf/:file_id", delete(handlers::delete_dxf))
        .route(
            "/:order_code/confirm-release",
            post(handlers::confirm_order_releases),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Release routes (protected)
fn release_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_releases).post(handlers::create_release))
        .route("/:release_id", get(handlers::get_release))
        .route("/:release_id/confirm", post(handlers::confirm_release))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sale and maintenance routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sales", post(handlers::create_sale))
        .route("/maintenances", post(handlers::create_maintenance))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order container routes (protected)
fn container_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_container))
        .route("/:container_id", get(handlers::get_container))
        .route("/:container_id/payment", put(handlers::update_payment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Attachment routes (protected)
fn attachment_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::upload_attachment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
