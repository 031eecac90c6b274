//! Database operations for budgets.
//!
//! None of these functions open a transaction themselves. Pass in a
//! transaction for `connection` if a budget and its costs must be written
//! together.

use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, types::Type};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error,
    budget::{Budget, BudgetId, NewBudget},
    product::ProductId,
    reference::ReferenceId,
};

const SELECT_BUDGET: &str = "SELECT id, product_id, expense_category_id, day_number, \
    expense_title, expense_code, currency_id, tax_id, department_id, sales_tax_group_id, \
    payment_type_id, total_budget, created_at, updated_at FROM budget";

/// Create a budget and its costs, returning the budget with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateBudget] if a budget with the same natural key
/// already exists, or [Error::InvalidForeignKey] if a referenced record is
/// missing.
pub fn create_budget(budget: &NewBudget, connection: &Connection) -> Result<Budget, Error> {
    let now = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO budget (product_id, expense_category_id, day_number, expense_title,
            expense_code, currency_id, tax_id, department_id, sales_tax_group_id,
            payment_type_id, total_budget, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        rusqlite::params![
            budget.product_id,
            budget.expense_category_id,
            budget.day_number,
            budget.expense_title,
            budget.expense_code,
            budget.currency_id,
            budget.tax_id,
            budget.department_id,
            budget.sales_tax_group_id,
            budget.payment_type_id,
            budget.total_budget.to_string(),
            now,
        ],
    )?;

    let id = connection.last_insert_rowid();
    insert_costs(id, budget, connection)?;

    get_budget(id, connection)
}

/// Overwrite the budget `budget_id` with `budget`, replacing all of its costs.
///
/// # Errors
/// Returns [Error::UpdateMissingBudget] if the budget does not exist, or
/// [Error::DuplicateBudget] if the new natural key belongs to another budget.
pub fn update_budget(
    budget_id: BudgetId,
    budget: &NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    let rows_affected = connection.execute(
        "UPDATE budget SET product_id = ?1, expense_category_id = ?2, day_number = ?3,
            expense_title = ?4, expense_code = ?5, currency_id = ?6, tax_id = ?7,
            department_id = ?8, sales_tax_group_id = ?9, payment_type_id = ?10,
            total_budget = ?11, updated_at = ?12
         WHERE id = ?13",
        rusqlite::params![
            budget.product_id,
            budget.expense_category_id,
            budget.day_number,
            budget.expense_title,
            budget.expense_code,
            budget.currency_id,
            budget.tax_id,
            budget.department_id,
            budget.sales_tax_group_id,
            budget.payment_type_id,
            budget.total_budget.to_string(),
            OffsetDateTime::now_utc(),
            budget_id,
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingBudget(budget_id));
    }

    connection.execute("DELETE FROM budget_cost WHERE budget_id = ?1", [budget_id])?;
    insert_costs(budget_id, budget, connection)?;

    get_budget(budget_id, connection)
}

/// Retrieve a single budget by ID.
pub fn get_budget(budget_id: BudgetId, connection: &Connection) -> Result<Budget, Error> {
    let mut budget = connection
        .prepare(&format!("{SELECT_BUDGET} WHERE id = :id"))?
        .query_row(&[(":id", &budget_id)], map_budget_row)?;

    load_costs(&mut budget, connection)?;

    Ok(budget)
}

/// Find the budget for a product, expense category and day number.
///
/// A missing day number only matches budgets without a day number.
pub fn find_budget_by_natural_key(
    product_id: ProductId,
    expense_category_id: ReferenceId,
    day_number: Option<u32>,
    connection: &Connection,
) -> Result<Option<Budget>, Error> {
    let maybe_budget = connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE product_id = ?1 AND expense_category_id = ?2 AND day_number IS ?3"
        ))?
        .query_row((product_id, expense_category_id, day_number), map_budget_row)
        .optional()?;

    match maybe_budget {
        Some(mut budget) => {
            load_costs(&mut budget, connection)?;
            Ok(Some(budget))
        }
        None => Ok(None),
    }
}

/// Retrieve every budget for a product ordered by day number.
pub fn get_budgets_for_product(
    product_id: ProductId,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    let mut budgets = connection
        .prepare(&format!(
            "{SELECT_BUDGET} WHERE product_id = ?1 ORDER BY day_number ASC NULLS FIRST, id ASC"
        ))?
        .query_map([product_id], map_budget_row)?
        .collect::<Result<Vec<Budget>, rusqlite::Error>>()?;

    for budget in &mut budgets {
        load_costs(budget, connection)?;
    }

    Ok(budgets)
}

/// Count the budgets across all products.
#[cfg(test)]
pub fn count_budgets(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(*) FROM budget", [], |row| row.get::<_, i64>(0))
        .map(|count| count as usize)
        .map_err(|error| error.into())
}

fn insert_costs(
    budget_id: BudgetId,
    budget: &NewBudget,
    connection: &Connection,
) -> Result<(), Error> {
    let mut stmt = connection.prepare(
        "INSERT INTO budget_cost (budget_id, kind, position, amount) VALUES (?1, ?2, ?3, ?4)",
    )?;

    for (kind, position, amount) in budget.costs() {
        stmt.execute((budget_id, kind.as_str(), position as i64, amount.to_string()))?;
    }

    Ok(())
}

fn load_costs(budget: &mut Budget, connection: &Connection) -> Result<(), Error> {
    let mut stmt = connection
        .prepare("SELECT kind, position, amount FROM budget_cost WHERE budget_id = ?1")?;
    let rows = stmt.query_map([budget.id], |row| {
        let kind: String = row.get(0)?;
        let position: i64 = row.get(1)?;
        let amount = get_decimal(row, 2)?;

        Ok((kind, position, amount))
    })?;

    for row in rows {
        let (kind, position, amount) = row?;
        let index = (position - 1) as usize;

        let slot = match kind.as_str() {
            "passenger" => budget.passenger_costs.get_mut(index),
            "leader" => budget.leader_costs.get_mut(index),
            _ => None,
        };

        match slot {
            Some(slot) => *slot = Some(amount),
            None => tracing::warn!(
                "Ignoring {kind} cost at position {position} for budget {}",
                budget.id
            ),
        }
    }

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        product_id: row.get(1)?,
        expense_category_id: row.get(2)?,
        day_number: row.get(3)?,
        expense_title: row.get(4)?,
        expense_code: row.get(5)?,
        currency_id: row.get(6)?,
        tax_id: row.get(7)?,
        department_id: row.get(8)?,
        sales_tax_group_id: row.get(9)?,
        payment_type_id: row.get(10)?,
        passenger_costs: Default::default(),
        leader_costs: Default::default(),
        total_budget: get_decimal(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn get_decimal(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    Decimal::from_str(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}
