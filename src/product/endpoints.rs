//! HTTP handlers for products.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    product::{
        Product, ProductId, core::ProductFormData, create_product, get_all_products, get_product,
    },
    reference::ReferenceCode,
};

/// The state needed for managing products.
#[derive(Debug, Clone)]
pub struct ProductState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProductState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List every product.
pub async fn list_products_endpoint(
    State(state): State<ProductState>,
) -> Result<Json<Vec<Product>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_all_products(&connection).map(Json)
}

/// Get a single product.
pub async fn get_product_endpoint(
    State(state): State<ProductState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Product>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_product(product_id, &connection).map(Json)
}

/// Create a product.
pub async fn create_product_endpoint(
    State(state): State<ProductState>,
    Json(form): Json<ProductFormData>,
) -> Result<Response, Error> {
    let code = ReferenceCode::new(&form.code)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let product = create_product(code, &form.name, &connection)?;
    tracing::info!("Created product \"{}\" with ID {}", product.code, product.id);

    let location = format_endpoint(endpoints::PRODUCT, product.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(product),
    )
        .into_response())
}
