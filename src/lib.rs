//! Trip budgets is a web service for managing trip expenses and budgets.
//!
//! Administrators maintain products (trips) and reference data (currencies,
//! taxes, departments and so on). Budgets for a product are loaded in bulk
//! from CSV uploads: every row is parsed, validated against the reference
//! data, and then created or updated in the database, with a per-row report
//! sent back to the caller.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod budget;
mod budget_upload;
mod config;
mod database_id;
mod db;
mod endpoints;
mod logging;
mod not_found;
mod product;
mod reference;
mod routing;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use budget::{Budget, BudgetId};
pub use budget_upload::{BatchResult, RowDisplay, UploadOutcome, process_budget_upload};
pub use config::{MatchPolicy, UploadConfig};
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use product::{Product, ProductId, create_product};
pub use reference::{ReferenceCategory, ReferenceCode, ReferenceRecord, create_reference};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The uploaded file could not be decoded as CSV at all.
    ///
    /// This is the only upload error that aborts a whole batch, every other
    /// problem is reported against the row it occurred on.
    #[error("Could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form contained a file that is not a CSV.
    #[error("File is not a CSV")]
    NotCSV,

    /// The multipart form did not contain a file to upload.
    #[error("No file was uploaded")]
    MissingUploadFile,

    /// The product ID sent alongside an upload is not an integer.
    #[error("\"{0}\" is not a valid product ID")]
    InvalidProductId(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A budget with the same product, expense category and day number
    /// already exists.
    #[error("a budget for this product, expense code and day number already exists")]
    DuplicateBudget,

    /// A code or other unique value already exists in the given `table.column`.
    #[error("the value for {0} already exists")]
    DuplicateCode(String),

    /// A query referenced a row that does not exist.
    #[error("a referenced record does not exist")]
    InvalidForeignKey,

    /// Tried to update a budget that does not exist.
    #[error("budget {0} does not exist")]
    UpdateMissingBudget(i64),

    /// Tried to update a budget through a product it does not belong to.
    #[error("budget {0} belongs to a different product")]
    BudgetProductMismatch(i64),

    /// An empty string was used as a code.
    #[error("code cannot be empty")]
    EmptyCode,

    /// An empty string was used as a name.
    #[error("name cannot be empty")]
    EmptyName,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while writing budgets as CSV.
    #[error("could not write CSV: {0}")]
    CsvWriteError(String),
}

/// The name of the index that enforces the budget natural key.
pub(crate) const BUDGET_NATURAL_KEY_INDEX: &str = "idx_budget_natural_key";

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains(BUDGET_NATURAL_KEY_INDEX) =>
            {
                Error::DuplicateBudget
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 =>
            {
                let column = desc
                    .rsplit(": ")
                    .next()
                    .unwrap_or(desc.as_str())
                    .to_owned();
                Error::DuplicateCode(column)
            }
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
                Error::InvalidForeignKey
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidCSV(_)
            | Error::MultipartError(_)
            | Error::NotCSV
            | Error::MissingUploadFile
            | Error::InvalidProductId(_)
            | Error::EmptyCode
            | Error::EmptyName
            | Error::InvalidForeignKey
            | Error::BudgetProductMismatch(_) => StatusCode::BAD_REQUEST,
            Error::NotFound | Error::UpdateMissingBudget(_) => StatusCode::NOT_FOUND,
            Error::DuplicateBudget | Error::DuplicateCode(_) => StatusCode::CONFLICT,
            Error::SqlError(_) | Error::DatabaseLockError | Error::CsvWriteError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Any errors that are not handled above are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::Error;

    #[test]
    fn unique_violation_maps_to_duplicate_code() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch("CREATE TABLE currency (id INTEGER PRIMARY KEY, code TEXT UNIQUE);")
            .unwrap();
        connection
            .execute("INSERT INTO currency (code) VALUES ('NZD')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO currency (code) VALUES ('NZD')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::DuplicateCode("currency.code".to_owned()));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn invalid_csv_is_bad_request() {
        let response = Error::InvalidCSV("bad bytes".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lock_error_is_internal_server_error() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
