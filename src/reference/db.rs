//! Database operations for reference data.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    reference::{ReferenceCategory, ReferenceCode, ReferenceRecord},
};

/// Create a reference record and return it with its generated ID.
///
/// # Errors
/// Returns [Error::EmptyName] if `name` is blank, or [Error::DuplicateCode]
/// if `code` already exists in `category`.
pub fn create_reference(
    category: ReferenceCategory,
    code: ReferenceCode,
    name: &str,
    connection: &Connection,
) -> Result<ReferenceRecord, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection.execute(
        &format!(
            "INSERT INTO {} (code, name) VALUES (?1, ?2);",
            category.table_name()
        ),
        (code.as_ref(), name),
    )?;

    let id = connection.last_insert_rowid();

    Ok(ReferenceRecord {
        id,
        code,
        name: name.to_owned(),
    })
}

/// Retrieve every record in `category` ordered by code.
pub fn list_references(
    category: ReferenceCategory,
    connection: &Connection,
) -> Result<Vec<ReferenceRecord>, Error> {
    connection
        .prepare(&format!(
            "SELECT id, code, name FROM {} ORDER BY code ASC;",
            category.table_name()
        ))?
        .query_map([], map_row)?
        .map(|maybe_record| maybe_record.map_err(|error| error.into()))
        .collect()
}

/// Create the tables for every reference category.
pub fn create_reference_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for category in ReferenceCategory::ALL {
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL
                )",
                category.table_name()
            ),
            (),
        )?;
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<ReferenceRecord, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_code: String = row.get(1)?;
    let name = row.get(2)?;

    Ok(ReferenceRecord {
        id,
        code: ReferenceCode::new_unchecked(&raw_code),
        name,
    })
}
