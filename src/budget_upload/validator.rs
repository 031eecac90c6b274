//! Checks each [UploadRow] and resolves its codes against the reference data.
//!
//! Validation never touches the database: everything it needs comes from the
//! [ReferenceLookup] snapshot taken at the start of the upload.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    budget::{BudgetId, LEADER_COST_COLUMNS, NewBudget, PASSENGER_COST_COLUMNS, generate_expense_code},
    budget_upload::{
        outcome::RowDisplay,
        row::{Column, UploadRow},
    },
    config::MatchPolicy,
    reference::{ReferenceCategory, ReferenceId, ReferenceLookup},
};

/// A row whose codes all resolved and is ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBudgetLine {
    /// See [UploadRow::row_number].
    pub row_number: usize,
    /// The existing budget named by the row's `Id` column.
    pub budget_id: Option<BudgetId>,
    /// The fields to write.
    pub budget: NewBudget,
    pub display: RowDisplay,
}

/// A row that failed validation and must not be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRow {
    pub row_number: usize,
    pub display: RowDisplay,
    /// Every problem found on the row, separated by "; ".
    pub reason: String,
}

/// The result of validating one row.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedRow {
    Resolved(ResolvedBudgetLine),
    Invalid(InvalidRow),
}

/// Validate `row` and resolve its codes using `reference`.
///
/// A row is only resolved when every required field is present, every number
/// parses and every code that is present exists. Otherwise all the problems
/// found are reported together in an [InvalidRow].
///
/// The `Id` column is only read when `match_policy` uses it, so a policy that
/// matches on the natural key accepts rows with stale or malformed IDs.
pub fn validate_row(
    row: UploadRow,
    reference: &impl ReferenceLookup,
    match_policy: MatchPolicy,
) -> ValidatedRow {
    let row_number = row.row_number;
    let mut problems = Vec::new();

    let product = match row.product_id {
        Some(product_id) => {
            let product = reference.product(product_id);
            if product.is_none() {
                problems.push(format!("unknown product ID {product_id}"));
            }
            product
        }
        None => {
            problems.push("ProductId is required".to_owned());
            None
        }
    };

    if row.expense_title.is_none() {
        problems.push(format!("{} is required", Column::ExpenseTitle));
    }

    if row.expense_code.is_none() {
        problems.push(format!("{} is required", Column::ExpenseCode));
    }

    let raw_id = row.id.as_deref().filter(|_| match_policy.uses_id());
    let budget_id = raw_id.and_then(|raw| {
        let id = raw.parse::<BudgetId>().ok().filter(|id| *id > 0);
        if id.is_none() {
            problems.push(format!(
                "row {row_number}: {} \"{raw}\" is not a valid budget ID",
                Column::Id
            ));
        }
        id
    });

    let day_number = row.day_number.as_deref().and_then(|raw| {
        let day = raw.parse::<u32>().ok();
        if day.is_none() {
            problems.push(format!(
                "row {row_number}: {} \"{raw}\" is not a non-negative whole number",
                Column::DayNumber
            ));
        }
        day
    });

    let mut resolve = |category: ReferenceCategory, code: Option<&str>| -> Option<ReferenceId> {
        let code = code?;
        let record = reference.find(category, code);
        if record.is_none() {
            problems.push(format!("unknown {category} \"{code}\""));
        }
        record.map(|record| record.id)
    };

    let expense_category_id = resolve(
        ReferenceCategory::ExpenseCategory,
        row.expense_code.as_deref(),
    );
    let currency_id = resolve(ReferenceCategory::Currency, row.currency_code.as_deref());
    let payment_type_id = resolve(ReferenceCategory::PaymentType, row.payment_type.as_deref());
    let tax_id = resolve(ReferenceCategory::Tax, row.sales_tax_code.as_deref());
    let sales_tax_group_id = resolve(
        ReferenceCategory::SalesTaxGroup,
        row.sales_tax_group.as_deref(),
    );
    let department_id = resolve(
        ReferenceCategory::Department,
        row.department_code.as_deref(),
    );

    let mut passenger_costs = [None; PASSENGER_COST_COLUMNS];
    for (index, raw) in row.passenger_costs.iter().enumerate() {
        passenger_costs[index] = parse_cost(
            Column::PassengerCost(index + 1),
            raw.as_deref(),
            row_number,
            &mut problems,
        );
    }

    let mut leader_costs = [None; LEADER_COST_COLUMNS];
    for (index, raw) in row.leader_costs.iter().enumerate() {
        leader_costs[index] = parse_cost(
            Column::LeaderCost(index + 1),
            raw.as_deref(),
            row_number,
            &mut problems,
        );
    }

    let total_budget = sum_costs(passenger_costs.iter().chain(leader_costs.iter()));
    if total_budget.is_none() {
        problems.push(format!("row {row_number}: the total budget is too large"));
    }

    let display = RowDisplay {
        expense_title: row.expense_title.clone(),
        expense_code: row.expense_code.clone(),
        day_number,
        currency_code: row.currency_code.clone(),
        payment_type: row.payment_type.clone(),
        tax_code: row.sales_tax_code.clone(),
        sales_tax_group_code: row.sales_tax_group.clone(),
        department_code: row.department_code.clone(),
        product_code: product.map(|product| product.code.to_string()),
    };

    match (
        problems.is_empty(),
        product,
        row.expense_title,
        row.expense_code,
        expense_category_id,
        total_budget,
    ) {
        (
            true,
            Some(product),
            Some(expense_title),
            Some(expense_code),
            Some(expense_category_id),
            Some(total_budget),
        ) => ValidatedRow::Resolved(ResolvedBudgetLine {
            row_number,
            budget_id,
            budget: NewBudget {
                product_id: product.id,
                expense_category_id,
                day_number,
                expense_title,
                expense_code: Some(generate_expense_code(&expense_code, day_number)),
                currency_id,
                tax_id,
                department_id,
                sales_tax_group_id,
                payment_type_id,
                passenger_costs,
                leader_costs,
                total_budget,
            },
            display,
        }),
        _ => ValidatedRow::Invalid(InvalidRow {
            row_number,
            display,
            reason: problems.join("; "),
        }),
    }
}

fn parse_cost(
    column: Column,
    raw: Option<&str>,
    row_number: usize,
    problems: &mut Vec<String>,
) -> Option<Decimal> {
    let raw = raw?;

    // Plain decimal notation only: `Decimal::from_str` also accepts "1_000" and "1e2".
    let is_plain = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));

    match Decimal::from_str(raw) {
        Ok(amount) if is_plain && (!amount.is_sign_negative() || amount.is_zero()) => {
            Some(amount)
        }
        _ => {
            problems.push(format!(
                "row {row_number}: {column} \"{raw}\" is not a non-negative number"
            ));
            None
        }
    }
}

/// Add up the costs and round half-up to cents, or `None` on overflow.
fn sum_costs<'a>(costs: impl Iterator<Item = &'a Option<Decimal>>) -> Option<Decimal> {
    costs
        .flatten()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
        .map(|total| total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}
