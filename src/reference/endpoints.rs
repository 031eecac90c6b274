//! HTTP handlers for listing and creating reference data.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    reference::{
        ReferenceCategory, ReferenceCode, ReferenceRecord, create_reference,
        domain::ReferenceFormData, list_references,
    },
};

/// The state needed for managing reference data.
#[derive(Debug, Clone)]
pub struct ReferenceState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReferenceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the records in one reference category.
pub async fn list_references_endpoint(
    State(state): State<ReferenceState>,
    Path(category): Path<ReferenceCategory>,
) -> Result<Json<Vec<ReferenceRecord>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    list_references(category, &connection).map(Json)
}

/// Create a record in one reference category.
pub async fn create_reference_endpoint(
    State(state): State<ReferenceState>,
    Path(category): Path<ReferenceCategory>,
    Json(form): Json<ReferenceFormData>,
) -> Result<Response, Error> {
    let code = ReferenceCode::new(&form.code)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let record = create_reference(category, code, &form.name, &connection)?;
    tracing::info!("Created {category} \"{}\"", record.code);

    Ok((StatusCode::CREATED, Json(record)).into_response())
}
