//! Creates the application's database tables.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, budget::create_budget_tables, budget_upload::create_upload_tables,
    product::create_product_table, reference::create_reference_tables,
};

/// Create the tables for every domain model and enable foreign keys.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_product_table(&transaction)?;
    create_reference_tables(&transaction)?;
    create_budget_tables(&transaction)?;
    create_upload_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}
