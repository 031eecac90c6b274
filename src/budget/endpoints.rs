//! HTTP handlers for reading budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget::{Budget, get_budgets_for_product},
    product::{ProductId, get_product},
};

/// The state needed for reading budgets.
#[derive(Debug, Clone)]
pub struct BudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the budgets of a product, ordered by day number.
///
/// Responds with 404 if the product does not exist.
pub async fn list_budgets_endpoint(
    State(state): State<BudgetState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Vec<Budget>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_product(product_id, &connection)?;

    get_budgets_for_product(product_id, &connection).map(Json)
}
