use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{BUDGET_NATURAL_KEY_INDEX, DatabaseId, product::ProductId, reference::ReferenceId};

/// Database identifier for a budget.
pub type BudgetId = DatabaseId;

/// The number of per-day passenger cost columns in an upload.
pub const PASSENGER_COST_COLUMNS: usize = 16;
/// The number of per-day leader cost columns in an upload.
pub const LEADER_COST_COLUMNS: usize = 5;

/// Who a budgeted cost is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    /// A cost per paying passenger.
    Passenger,
    /// A cost per trip leader.
    Leader,
}

impl CostKind {
    /// The value stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            CostKind::Passenger => "passenger",
            CostKind::Leader => "leader",
        }
    }
}

/// The fields written when a budget is created or updated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    /// The product the budget belongs to.
    pub product_id: ProductId,
    /// The expense category. Together with the product and day number this
    /// identifies the budget.
    pub expense_category_id: ReferenceId,
    /// The day of the trip, or `None` for a cost that spans the whole trip.
    pub day_number: Option<u32>,
    /// A short description of the expense.
    pub expense_title: String,
    /// Generated from the expense category code and day number.
    pub expense_code: Option<String>,
    /// The currency the costs are in.
    pub currency_id: Option<ReferenceId>,
    /// The tax code applied to the costs.
    pub tax_id: Option<ReferenceId>,
    /// The department the expense is charged to.
    pub department_id: Option<ReferenceId>,
    /// The sales tax group.
    pub sales_tax_group_id: Option<ReferenceId>,
    /// How the expense is paid.
    pub payment_type_id: Option<ReferenceId>,
    /// The passenger costs by position, `None` where the cell was blank.
    pub passenger_costs: [Option<Decimal>; PASSENGER_COST_COLUMNS],
    /// The leader costs by position, `None` where the cell was blank.
    pub leader_costs: [Option<Decimal>; LEADER_COST_COLUMNS],
    /// The sum of every passenger and leader cost, rounded to cents.
    pub total_budget: Decimal,
}

impl NewBudget {
    /// The present costs as (kind, 1-based position, amount).
    pub fn costs(&self) -> impl Iterator<Item = (CostKind, usize, Decimal)> + '_ {
        let passenger = self
            .passenger_costs
            .iter()
            .enumerate()
            .filter_map(|(index, cost)| cost.map(|amount| (CostKind::Passenger, index + 1, amount)));
        let leader = self
            .leader_costs
            .iter()
            .enumerate()
            .filter_map(|(index, cost)| cost.map(|amount| (CostKind::Leader, index + 1, amount)));

        passenger.chain(leader)
    }
}

/// A budgeted expense for a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
///
/// The fields mirror [NewBudget].
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The product the budget belongs to.
    pub product_id: ProductId,
    /// The expense category.
    pub expense_category_id: ReferenceId,
    /// The day of the trip, if any.
    pub day_number: Option<u32>,
    /// A short description of the expense.
    pub expense_title: String,
    /// Generated from the expense category code and day number.
    pub expense_code: Option<String>,
    /// The currency the costs are in.
    pub currency_id: Option<ReferenceId>,
    /// The tax code.
    pub tax_id: Option<ReferenceId>,
    /// The department.
    pub department_id: Option<ReferenceId>,
    /// The sales tax group.
    pub sales_tax_group_id: Option<ReferenceId>,
    /// The payment type.
    pub payment_type_id: Option<ReferenceId>,
    /// Passenger costs by position.
    pub passenger_costs: [Option<Decimal>; PASSENGER_COST_COLUMNS],
    /// Leader costs by position.
    pub leader_costs: [Option<Decimal>; LEADER_COST_COLUMNS],
    /// The sum of every cost, rounded to cents.
    pub total_budget: Decimal,
    /// When the budget was first saved.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the budget was last saved.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Build the expense code stored on a budget, e.g. "ACCOM-03" for day 3.
pub fn generate_expense_code(category_code: &str, day_number: Option<u32>) -> String {
    match day_number {
        Some(day) => format!("{category_code}-{day:02}"),
        None => category_code.to_owned(),
    }
}

/// Create the budget and budget cost tables.
pub fn create_budget_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            product_id INTEGER NOT NULL REFERENCES product(id),
            expense_category_id INTEGER NOT NULL REFERENCES expense_category(id),
            day_number INTEGER,
            expense_title TEXT NOT NULL,
            expense_code TEXT,
            currency_id INTEGER REFERENCES currency(id),
            tax_id INTEGER REFERENCES tax(id),
            department_id INTEGER REFERENCES department(id),
            sales_tax_group_id INTEGER REFERENCES sales_tax_group(id),
            payment_type_id INTEGER REFERENCES payment_type(id),
            total_budget TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS {BUDGET_NATURAL_KEY_INDEX}
            ON budget(product_id, expense_category_id, IFNULL(day_number, -1));

        CREATE TABLE IF NOT EXISTS budget_cost (
            budget_id INTEGER NOT NULL REFERENCES budget(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('passenger', 'leader')),
            position INTEGER NOT NULL,
            amount TEXT NOT NULL,
            PRIMARY KEY (budget_id, kind, position)
        );"
    ))?;

    Ok(())
}
