//! Core reference data types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{DatabaseId, Error};

/// Database identifier for a reference record.
pub type ReferenceId = DatabaseId;

/// The kinds of reference data a budget row can point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceCategory {
    /// ISO currency codes, e.g. "NZD".
    Currency,
    /// Internal departments that own an expense.
    Department,
    /// Tax codes.
    Tax,
    /// Groups of sales taxes applied together.
    SalesTaxGroup,
    /// How an expense is paid, e.g. "Card".
    PaymentType,
    /// The category of an expense, referenced by the `ExpenseCode` column.
    ExpenseCategory,
}

impl ReferenceCategory {
    /// Every category, in the order their tables are created.
    pub const ALL: [ReferenceCategory; 6] = [
        ReferenceCategory::Currency,
        ReferenceCategory::Department,
        ReferenceCategory::Tax,
        ReferenceCategory::SalesTaxGroup,
        ReferenceCategory::PaymentType,
        ReferenceCategory::ExpenseCategory,
    ];

    /// The table that stores records of this category.
    pub fn table_name(&self) -> &'static str {
        match self {
            ReferenceCategory::Currency => "currency",
            ReferenceCategory::Department => "department",
            ReferenceCategory::Tax => "tax",
            ReferenceCategory::SalesTaxGroup => "sales_tax_group",
            ReferenceCategory::PaymentType => "payment_type",
            ReferenceCategory::ExpenseCategory => "expense_category",
        }
    }

    /// How the category is named in messages shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceCategory::Currency => "currency code",
            ReferenceCategory::Department => "department code",
            ReferenceCategory::Tax => "tax code",
            ReferenceCategory::SalesTaxGroup => "sales tax group code",
            ReferenceCategory::PaymentType => "payment type",
            ReferenceCategory::ExpenseCategory => "expense code",
        }
    }
}

impl Display for ReferenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A validated, non-empty reference code.
///
/// Codes are matched exactly, so no case folding is applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceCode(String);

impl ReferenceCode {
    /// Create a reference code from `code` with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCode] if `code` is blank.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.is_empty() {
            Err(Error::EmptyCode)
        } else {
            Ok(Self(code.to_owned()))
        }
    }

    /// Create a reference code without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(code: &str) -> Self {
        Self(code.to_owned())
    }
}

impl AsRef<str> for ReferenceCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ReferenceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single code in one of the reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRecord {
    /// The ID of the record within its category's table.
    pub id: ReferenceId,
    /// The code used in uploaded files.
    pub code: ReferenceCode,
    /// A human readable description.
    pub name: String,
}

/// Form data for creating a reference record.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceFormData {
    pub code: String,
    pub name: String,
}
