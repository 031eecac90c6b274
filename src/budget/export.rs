//! Writes a product's budgets as a CSV file in the upload layout.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use csv::Writer;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget::{Budget, get_budgets_for_product},
    budget_upload::Column,
    product::{ProductId, get_product},
    reference::{ReferenceCategory, ReferenceData, ReferenceId},
};

/// The state needed for exporting budgets.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Download the budgets of a product as a CSV file that can be edited and
/// uploaded again.
pub async fn export_budgets_endpoint(
    State(state): State<ExportState>,
    Path(product_id): Path<ProductId>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let product = get_product(product_id, &connection)?;
    let reference = ReferenceData::load(&connection)?;
    let budgets = get_budgets_for_product(product_id, &connection)?;
    let data = write_budgets_csv(&budgets, &reference)?;

    tracing::debug!(
        "Exported {} budgets for product {}",
        budgets.len(),
        product.code
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}-budgets.csv\"", product.code),
            ),
        ],
        data,
    )
        .into_response())
}

/// Write `budgets` with a header row naming every upload column.
///
/// Reference IDs are written as their codes, and the expense code is the
/// expense category code so the file validates on upload.
pub fn write_budgets_csv(budgets: &[Budget], reference: &ReferenceData) -> Result<Vec<u8>, Error> {
    let columns = Column::all();
    let mut writer = Writer::from_writer(Vec::new());

    writer
        .write_record(columns.iter().map(|column| column.to_string()))
        .map_err(|error| Error::CsvWriteError(error.to_string()))?;

    for budget in budgets {
        let record = columns
            .iter()
            .map(|column| cell_for(*column, budget, reference));

        writer
            .write_record(record)
            .map_err(|error| Error::CsvWriteError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvWriteError(error.to_string()))
}

fn cell_for(column: Column, budget: &Budget, reference: &ReferenceData) -> String {
    let code = |category: ReferenceCategory, id: Option<ReferenceId>| {
        id.and_then(|id| reference.code_for(category, id))
            .map(|code| code.to_string())
            .unwrap_or_default()
    };

    match column {
        Column::Id => budget.id.to_string(),
        Column::DayNumber => budget
            .day_number
            .map(|day| day.to_string())
            .unwrap_or_default(),
        Column::ExpenseTitle => budget.expense_title.clone(),
        Column::ExpenseCode => code(
            ReferenceCategory::ExpenseCategory,
            Some(budget.expense_category_id),
        ),
        Column::CurrencyCode => code(ReferenceCategory::Currency, budget.currency_id),
        Column::PaymentType => code(ReferenceCategory::PaymentType, budget.payment_type_id),
        Column::SalesTaxCode => code(ReferenceCategory::Tax, budget.tax_id),
        Column::SalesTaxGroup => code(ReferenceCategory::SalesTaxGroup, budget.sales_tax_group_id),
        Column::DepartmentCode => code(ReferenceCategory::Department, budget.department_id),
        Column::PassengerCost(position) => budget.passenger_costs[position - 1]
            .map(|amount| amount.to_string())
            .unwrap_or_default(),
        Column::LeaderCost(position) => budget.leader_costs[position - 1]
            .map(|amount| amount.to_string())
            .unwrap_or_default(),
    }
}
