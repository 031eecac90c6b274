//! The columns of a budget upload and the raw row they are read into.

use std::fmt::Display;

use crate::{
    budget::{LEADER_COST_COLUMNS, PASSENGER_COST_COLUMNS},
    product::ProductId,
};

/// A column that may appear in the header of a budget upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// The ID of an existing budget to update.
    Id,
    DayNumber,
    ExpenseTitle,
    ExpenseCode,
    CurrencyCode,
    PaymentType,
    SalesTaxCode,
    SalesTaxGroup,
    DepartmentCode,
    /// `PassengerCost_1` to `PassengerCost_16`.
    PassengerCost(usize),
    /// `LeaderCost_1` to `LeaderCost_5`.
    LeaderCost(usize),
}

impl Column {
    /// Every column in the order they are written on export.
    pub fn all() -> Vec<Column> {
        let mut columns = vec![
            Column::Id,
            Column::DayNumber,
            Column::ExpenseTitle,
            Column::ExpenseCode,
            Column::CurrencyCode,
            Column::PaymentType,
            Column::SalesTaxCode,
            Column::SalesTaxGroup,
            Column::DepartmentCode,
        ];
        columns.extend((1..=PASSENGER_COST_COLUMNS).map(Column::PassengerCost));
        columns.extend((1..=LEADER_COST_COLUMNS).map(Column::LeaderCost));

        columns
    }

    /// Match a header name exactly, returning `None` for unknown names.
    pub fn from_header(name: &str) -> Option<Column> {
        let column = match name {
            "Id" => Column::Id,
            "DayNumber" => Column::DayNumber,
            "ExpenseTitle" => Column::ExpenseTitle,
            "ExpenseCode" => Column::ExpenseCode,
            "CurrencyCode" => Column::CurrencyCode,
            "PaymentType" => Column::PaymentType,
            "SalesTaxCode" => Column::SalesTaxCode,
            "SalesTaxGroup" => Column::SalesTaxGroup,
            "DepartmentCode" => Column::DepartmentCode,
            other => {
                if let Some(position) = other.strip_prefix("PassengerCost_") {
                    return parse_position(position, PASSENGER_COST_COLUMNS)
                        .map(Column::PassengerCost);
                }

                if let Some(position) = other.strip_prefix("LeaderCost_") {
                    return parse_position(position, LEADER_COST_COLUMNS).map(Column::LeaderCost);
                }

                return None;
            }
        };

        Some(column)
    }
}

fn parse_position(text: &str, max: usize) -> Option<usize> {
    // Reject "01" and "+1" so each column has exactly one spelling.
    if text.starts_with('0') || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    text.parse()
        .ok()
        .filter(|position| (1..=max).contains(position))
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Column::Id => write!(f, "Id"),
            Column::DayNumber => write!(f, "DayNumber"),
            Column::ExpenseTitle => write!(f, "ExpenseTitle"),
            Column::ExpenseCode => write!(f, "ExpenseCode"),
            Column::CurrencyCode => write!(f, "CurrencyCode"),
            Column::PaymentType => write!(f, "PaymentType"),
            Column::SalesTaxCode => write!(f, "SalesTaxCode"),
            Column::SalesTaxGroup => write!(f, "SalesTaxGroup"),
            Column::DepartmentCode => write!(f, "DepartmentCode"),
            Column::PassengerCost(position) => write!(f, "PassengerCost_{position}"),
            Column::LeaderCost(position) => write!(f, "LeaderCost_{position}"),
        }
    }
}

/// One data row of an upload, before any validation.
///
/// Blank cells are `None` and every other cell has been trimmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadRow {
    /// The 1-based position of the row in the file, not counting the header.
    pub row_number: usize,
    /// Supplied alongside the file rather than read from it.
    pub product_id: Option<ProductId>,
    /// The existing budget to update.
    pub id: Option<String>,
    pub day_number: Option<String>,
    pub expense_title: Option<String>,
    /// The expense category code.
    pub expense_code: Option<String>,
    pub currency_code: Option<String>,
    pub payment_type: Option<String>,
    pub sales_tax_code: Option<String>,
    pub sales_tax_group: Option<String>,
    pub department_code: Option<String>,
    /// `PassengerCost_1` to `PassengerCost_16`.
    pub passenger_costs: [Option<String>; PASSENGER_COST_COLUMNS],
    /// `LeaderCost_1` to `LeaderCost_5`.
    pub leader_costs: [Option<String>; LEADER_COST_COLUMNS],
}

impl UploadRow {
    /// Store `value` in the field for `column`.
    pub fn set(&mut self, column: Column, value: String) {
        let field = match column {
            Column::Id => &mut self.id,
            Column::DayNumber => &mut self.day_number,
            Column::ExpenseTitle => &mut self.expense_title,
            Column::ExpenseCode => &mut self.expense_code,
            Column::CurrencyCode => &mut self.currency_code,
            Column::PaymentType => &mut self.payment_type,
            Column::SalesTaxCode => &mut self.sales_tax_code,
            Column::SalesTaxGroup => &mut self.sales_tax_group,
            Column::DepartmentCode => &mut self.department_code,
            Column::PassengerCost(position) => &mut self.passenger_costs[position - 1],
            Column::LeaderCost(position) => &mut self.leader_costs[position - 1],
        };

        *field = Some(value);
    }
}
