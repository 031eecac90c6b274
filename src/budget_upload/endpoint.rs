//! The route handler for budget uploads.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::Field},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget_upload::{outcome::BatchResult, pipeline::process_budget_upload},
    config::UploadConfig,
    product::ProductId,
};

/// The multipart field holding the product the budgets belong to.
const PRODUCT_ID_FIELD: &str = "product_id";
/// The multipart field holding the CSV file.
const FILE_FIELD: &str = "file";

/// The state needed for uploading budgets.
#[derive(Debug, Clone)]
pub struct UploadState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub upload_config: UploadConfig,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_config: state.upload_config,
        }
    }
}

/// Route handler for uploading a CSV file of budgets.
///
/// Expects a multipart form with a `file` field holding the CSV file and a
/// `product_id` field. Responds with the outcome of every row, even when some
/// or all of the rows could not be saved.
pub async fn upload_budgets_endpoint(
    State(state): State<UploadState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, Error> {
    let mut product_id = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::debug!("Could not read multipart field: {error}");
        Error::MultipartError(error.body_text())
    })? {
        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            PRODUCT_ID_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|error| Error::MultipartError(error.body_text()))?;
                product_id = parse_product_id(&text)?;
            }
            FILE_FIELD => upload = Some(read_csv_field(field).await?),
            other => tracing::debug!("Ignoring multipart field '{other}'"),
        }
    }

    let (file_name, data) = upload.ok_or(Error::MissingUploadFile)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    process_budget_upload(
        &file_name,
        &data,
        product_id,
        state.upload_config.match_policy,
        &connection,
    )
    .map(Json)
}

/// A blank product ID is treated as missing so each row reports it.
fn parse_product_id(text: &str) -> Result<Option<ProductId>, Error> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(None);
    }

    text.parse()
        .map(Some)
        .map_err(|_| Error::InvalidProductId(text.to_owned()))
}

fn is_csv(content_type: Option<&str>, file_name: &str) -> bool {
    matches!(content_type, Some("text/csv") | Some("application/vnd.ms-excel"))
        || file_name.to_lowercase().ends_with(".csv")
}

async fn read_csv_field(field: Field<'_>) -> Result<(String, Vec<u8>), Error> {
    let file_name = field.file_name().unwrap_or("upload.csv").to_owned();

    if !is_csv(field.content_type(), &file_name) {
        tracing::debug!(
            "Rejected file '{file_name}' with content type {:?}",
            field.content_type()
        );
        return Err(Error::NotCSV);
    }

    let data = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError(error.body_text())
    })?;

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    Ok((file_name, data.to_vec()))
}
