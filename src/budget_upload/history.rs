//! A record of each upload and of every budget it changed.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::{Connection, Row};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    AppState, DatabaseId, Error, budget::BudgetId, budget_upload::BatchResult,
    config::MatchPolicy, product::ProductId,
};

/// Database identifier for an upload.
pub type UploadId = DatabaseId;

/// The number of uploads returned by [list_uploads_endpoint].
const RECENT_UPLOAD_LIMIT: usize = 50;

/// How an upload changed a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
}

impl ChangeKind {
    fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
        }
    }
}

/// A summary of one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    /// The ID of the upload.
    pub id: UploadId,
    /// The name of the uploaded file.
    pub file_name: String,
    /// The product chosen for the upload, if any.
    pub product_id: Option<ProductId>,
    /// The [crate::MatchPolicy] in effect, as stored.
    pub match_policy: String,
    /// The number of data rows in the file.
    pub row_count: i64,
    /// The number of rows saved.
    pub success_count: i64,
    /// The number of rows rejected.
    pub failure_count: i64,
    /// When the upload finished.
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// Create the upload history tables.
pub fn create_upload_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget_upload (
            id INTEGER PRIMARY KEY,
            file_name TEXT NOT NULL,
            product_id INTEGER,
            match_policy TEXT NOT NULL,
            row_count INTEGER NOT NULL DEFAULT 0,
            success_count INTEGER NOT NULL DEFAULT 0,
            failure_count INTEGER NOT NULL DEFAULT 0,
            uploaded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS budget_change (
            id INTEGER PRIMARY KEY,
            budget_id INTEGER NOT NULL REFERENCES budget(id) ON DELETE CASCADE,
            upload_id INTEGER NOT NULL REFERENCES budget_upload(id),
            row_number INTEGER NOT NULL,
            change TEXT NOT NULL CHECK (change IN ('created', 'updated'))
        );

        CREATE INDEX IF NOT EXISTS idx_budget_change_upload ON budget_change(upload_id);",
    )?;

    Ok(())
}

/// Start the record for an upload, before any of its rows are saved.
pub fn create_upload_record(
    file_name: &str,
    product_id: Option<ProductId>,
    match_policy: MatchPolicy,
    connection: &Connection,
) -> Result<UploadId, Error> {
    connection.execute(
        "INSERT INTO budget_upload (file_name, product_id, match_policy, uploaded_at)
         VALUES (?1, ?2, ?3, ?4)",
        (
            file_name,
            product_id,
            match_policy.as_str(),
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Store the row counts of a finished upload.
pub fn finish_upload_record(
    upload_id: UploadId,
    result: &BatchResult,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE budget_upload SET row_count = ?1, success_count = ?2, failure_count = ?3
         WHERE id = ?4",
        (
            result.results.len() as i64,
            result.success_count() as i64,
            result.failure_count() as i64,
            upload_id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Note that row `row_number` of an upload created or updated a budget.
pub fn record_budget_change(
    upload_id: UploadId,
    budget_id: BudgetId,
    row_number: usize,
    change: ChangeKind,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO budget_change (budget_id, upload_id, row_number, change)
         VALUES (?1, ?2, ?3, ?4)",
        (budget_id, upload_id, row_number as i64, change.as_str()),
    )?;

    Ok(())
}

/// The most recent uploads, newest first.
pub fn get_recent_uploads(limit: usize, connection: &Connection) -> Result<Vec<UploadRecord>, Error> {
    connection
        .prepare(
            "SELECT id, file_name, product_id, match_policy, row_count, success_count,
                failure_count, uploaded_at
             FROM budget_upload ORDER BY id DESC LIMIT ?1",
        )?
        .query_map([limit as i64], map_upload_row)?
        .map(|maybe_upload| maybe_upload.map_err(|error| error.into()))
        .collect()
}

/// Count the budgets an upload created and updated, in that order.
pub fn count_budget_changes(
    upload_id: UploadId,
    connection: &Connection,
) -> Result<(usize, usize), Error> {
    connection
        .query_row(
            "SELECT
                COUNT(*) FILTER (WHERE change = 'created'),
                COUNT(*) FILTER (WHERE change = 'updated')
             FROM budget_change WHERE upload_id = ?1",
            [upload_id],
            |row| Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize)),
        )
        .map_err(|error| error.into())
}

fn map_upload_row(row: &Row) -> Result<UploadRecord, rusqlite::Error> {
    Ok(UploadRecord {
        id: row.get(0)?,
        file_name: row.get(1)?,
        product_id: row.get(2)?,
        match_policy: row.get(3)?,
        row_count: row.get(4)?,
        success_count: row.get(5)?,
        failure_count: row.get(6)?,
        uploaded_at: row.get(7)?,
    })
}

/// The state needed for listing uploads.
#[derive(Debug, Clone)]
pub struct UploadHistoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UploadHistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the most recent uploads.
pub async fn list_uploads_endpoint(
    State(state): State<UploadHistoryState>,
) -> Result<Json<Vec<UploadRecord>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_recent_uploads(RECENT_UPLOAD_LIMIT, &connection).map(Json)
}
