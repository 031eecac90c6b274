//! Budgets: the planned cost of an expense for a product, per day of the trip.

mod core;
mod db;
mod endpoints;
mod export;

pub use self::core::{
    Budget, BudgetId, CostKind, LEADER_COST_COLUMNS, NewBudget, PASSENGER_COST_COLUMNS,
    create_budget_tables, generate_expense_code,
};
#[cfg(test)]
pub use db::count_budgets;
pub use db::{
    create_budget, find_budget_by_natural_key, get_budget, get_budgets_for_product,
    update_budget,
};
pub use endpoints::list_budgets_endpoint;
pub use export::export_budgets_endpoint;
