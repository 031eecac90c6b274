use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{DatabaseId, Error, reference::ReferenceCode};

/// Database identifier for a product.
pub type ProductId = DatabaseId;

/// A trip that budgets are planned for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// The id for the product.
    pub id: ProductId,
    /// The unique code used when reporting on the product.
    pub code: ReferenceCode,
    /// The name of the product.
    pub name: String,
}

/// Form data for product creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductFormData {
    pub code: String,
    pub name: String,
}

/// Create the product table.
pub fn create_product_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Create a product and return it with its generated ID.
///
/// # Errors
/// Returns [Error::EmptyName] if `name` is blank, or [Error::DuplicateCode]
/// if another product already uses `code`.
pub fn create_product(
    code: ReferenceCode,
    name: &str,
    connection: &Connection,
) -> Result<Product, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection.execute(
        "INSERT INTO product (code, name) VALUES (?1, ?2)",
        (code.as_ref(), name),
    )?;

    Ok(Product {
        id: connection.last_insert_rowid(),
        code,
        name: name.to_owned(),
    })
}

/// Retrieve a single product by ID.
pub fn get_product(product_id: ProductId, connection: &Connection) -> Result<Product, Error> {
    connection
        .prepare("SELECT id, code, name FROM product WHERE id = :id")?
        .query_row(&[(":id", &product_id)], map_row_to_product)
        .map_err(|error| error.into())
}

/// Retrieve all products ordered by code.
pub fn get_all_products(connection: &Connection) -> Result<Vec<Product>, Error> {
    connection
        .prepare("SELECT id, code, name FROM product ORDER BY code ASC")?
        .query_map([], map_row_to_product)?
        .map(|maybe_product| maybe_product.map_err(|error| error.into()))
        .collect()
}

fn map_row_to_product(row: &Row) -> Result<Product, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_code: String = row.get(1)?;
    let name = row.get(2)?;

    Ok(Product {
        id,
        code: ReferenceCode::new_unchecked(&raw_code),
        name,
    })
}
