//! The integer type behind every table's primary key.

/// Alias for the SQLite `INTEGER PRIMARY KEY` type used by products,
/// reference records, budgets and uploads.
pub type DatabaseId = i64;
