//! The per-row report returned for an upload.

use serde::Serialize;

use crate::budget::BudgetId;

/// The identifying fields of a row, echoed back so a report can be read
/// without the original file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDisplay {
    /// The `ExpenseTitle` cell.
    pub expense_title: Option<String>,
    /// The `ExpenseCode` cell as uploaded, not the generated code.
    pub expense_code: Option<String>,
    /// The `DayNumber` cell, if it parsed.
    pub day_number: Option<u32>,
    /// The `CurrencyCode` cell.
    pub currency_code: Option<String>,
    /// The `PaymentType` cell.
    pub payment_type: Option<String>,
    /// The `TaxCode` cell.
    pub tax_code: Option<String>,
    /// The `SalesTaxGroupCode` cell.
    pub sales_tax_group_code: Option<String>,
    /// The `DepartmentCode` cell.
    pub department_code: Option<String>,
    /// The `ProductCode` cell.
    pub product_code: Option<String>,
}

/// Whether a single row of an upload was saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// The ID of the budget that was created or updated.
    pub id: Option<BudgetId>,
    /// The row's identifying fields.
    #[serde(flatten)]
    pub display: RowDisplay,
    /// Whether the row was saved.
    pub is_success: bool,
    /// Empty when the row was saved.
    pub error_message: String,
    /// The 1-based data row number, not counting the header.
    pub row_number: usize,
}

impl UploadOutcome {
    /// The outcome for a row saved as the budget `budget_id`.
    pub fn success(row_number: usize, budget_id: BudgetId, display: RowDisplay) -> Self {
        Self {
            id: Some(budget_id),
            display,
            is_success: true,
            error_message: String::new(),
            row_number,
        }
    }

    /// The outcome for a row that was not saved because of `reason`.
    pub fn failure(row_number: usize, display: RowDisplay, reason: String) -> Self {
        Self {
            id: None,
            display,
            is_success: false,
            error_message: reason,
            row_number,
        }
    }
}

/// The report for a whole upload.
///
/// `upload_status` is true when at least one row was saved. It does not mean
/// every row was saved: check [UploadOutcome::is_success] for each row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// True when at least one row was saved.
    pub upload_status: bool,
    /// One outcome per data row, in file order.
    pub results: Vec<UploadOutcome>,
}

impl BatchResult {
    /// Build the report from the outcomes of every row.
    pub fn new(results: Vec<UploadOutcome>) -> Self {
        Self {
            upload_status: results.iter().any(|outcome| outcome.is_success),
            results,
        }
    }

    /// The report for an upload with no data rows.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The number of rows that were saved.
    pub fn success_count(&self) -> usize {
        self.results
            .iter()
            .filter(|outcome| outcome.is_success)
            .count()
    }

    /// The number of rows that were not saved.
    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

#[cfg(test)]
mod batch_result_tests {
    use serde_json::json;

    use super::{BatchResult, RowDisplay, UploadOutcome};

    #[test]
    fn empty_batch_is_not_successful() {
        let result = BatchResult::empty();

        assert!(!result.upload_status);
        assert!(result.results.is_empty());
    }

    #[test]
    fn batch_with_only_failures_is_not_successful() {
        let result = BatchResult::new(vec![UploadOutcome::failure(
            1,
            RowDisplay::default(),
            "ExpenseTitle is required".to_owned(),
        )]);

        assert!(!result.upload_status);
        assert_eq!(result.failure_count(), 1);
    }

    #[test]
    fn partial_success_is_successful() {
        let result = BatchResult::new(vec![
            UploadOutcome::success(1, 10, RowDisplay::default()),
            UploadOutcome::failure(2, RowDisplay::default(), "bad".to_owned()),
        ]);

        assert!(result.upload_status);
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failure_count(), 1);
    }

    #[test]
    fn serializes_with_flat_camel_case_fields() {
        let display = RowDisplay {
            expense_title: Some("Hotel".to_owned()),
            expense_code: Some("ACCOM".to_owned()),
            day_number: Some(2),
            currency_code: Some("NZD".to_owned()),
            payment_type: None,
            tax_code: Some("GST".to_owned()),
            sales_tax_group_code: None,
            department_code: Some("OPS".to_owned()),
            product_code: Some("NZ-SOUTH-14".to_owned()),
        };
        let result = BatchResult::new(vec![UploadOutcome::success(1, 5, display)]);

        let got = serde_json::to_value(&result).unwrap();

        assert_eq!(
            got,
            json!({
                "uploadStatus": true,
                "results": [{
                    "id": 5,
                    "expenseTitle": "Hotel",
                    "expenseCode": "ACCOM",
                    "dayNumber": 2,
                    "currencyCode": "NZD",
                    "paymentType": null,
                    "taxCode": "GST",
                    "salesTaxGroupCode": null,
                    "departmentCode": "OPS",
                    "productCode": "NZ-SOUTH-14",
                    "isSuccess": true,
                    "errorMessage": "",
                    "rowNumber": 1
                }]
            })
        );
    }
}
