//! Bulk budget uploads.
//!
//! An upload flows through three stages. `RowParser` turns the CSV file into
//! raw rows, `validate_row` checks each row and resolves its codes against the
//! reference data, and `commit_batch` saves each valid row in its own
//! transaction. Only a file that cannot be decoded fails the whole upload.

mod committer;
mod endpoint;
mod history;
mod outcome;
mod parser;
mod pipeline;
mod row;
mod validator;

pub use endpoint::upload_budgets_endpoint;
pub use history::{create_upload_tables, list_uploads_endpoint};
pub use outcome::{BatchResult, RowDisplay, UploadOutcome};
pub use pipeline::process_budget_upload;
pub use row::Column;
