//! Application router configuration.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::{
    AppState,
    budget::{export_budgets_endpoint, list_budgets_endpoint},
    budget_upload::{list_uploads_endpoint, upload_budgets_endpoint},
    endpoints,
    not_found::get_404_not_found,
    product::{create_product_endpoint, get_product_endpoint, list_products_endpoint},
    reference::{create_reference_endpoint, list_references_endpoint},
};

/// Return a router with all the app's routes.
///
/// The upload route accepts bodies up to the configured upload size, every
/// other route keeps axum's default limit.
pub fn build_router(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route(endpoints::UPLOAD_BUDGETS, post(upload_budgets_endpoint))
        .layer(DefaultBodyLimit::max(state.upload_config.max_upload_bytes));

    Router::new()
        .route(
            endpoints::REFERENCES,
            get(list_references_endpoint).post(create_reference_endpoint),
        )
        .route(
            endpoints::PRODUCTS,
            get(list_products_endpoint).post(create_product_endpoint),
        )
        .route(endpoints::PRODUCT, get(get_product_endpoint))
        .route(endpoints::PRODUCT_BUDGETS, get(list_budgets_endpoint))
        .route(endpoints::EXPORT_BUDGETS, get(export_budgets_endpoint))
        .route(endpoints::UPLOADS, get(list_uploads_endpoint))
        .merge(upload_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}
