#![allow(missing_docs)]

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    budget::{LEADER_COST_COLUMNS, NewBudget, PASSENGER_COST_COLUMNS},
    db::initialize,
    product::{ProductId, create_product},
    reference::{ReferenceCategory, ReferenceCode, ReferenceId, create_reference},
};

/// An in-memory database with one product and a small set of reference data.
///
/// The product "NZ-SOUTH-14" has ID 1, and the expense categories "ACCOM"
/// and "MEALS" have IDs 1 and 2.
pub(crate) fn get_seeded_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    create_product(
        ReferenceCode::new_unchecked("NZ-SOUTH-14"),
        "South Island in 14 days",
        &connection,
    )
    .expect("Could not create product");

    let records = [
        (ReferenceCategory::ExpenseCategory, "ACCOM", "Accommodation"),
        (ReferenceCategory::ExpenseCategory, "MEALS", "Meals"),
        (ReferenceCategory::Currency, "NZD", "New Zealand dollar"),
        (ReferenceCategory::Currency, "AUD", "Australian dollar"),
        (ReferenceCategory::Department, "OPS", "Operations"),
        (ReferenceCategory::Tax, "GST", "Goods and services tax"),
        (ReferenceCategory::SalesTaxGroup, "NZGST", "New Zealand GST"),
        (ReferenceCategory::PaymentType, "Card", "Credit card"),
    ];

    for (category, code, name) in records {
        create_reference(category, ReferenceCode::new_unchecked(code), name, &connection)
            .expect("Could not create reference record");
    }

    connection
}

/// A budget titled "Hotel" with no costs or optional codes.
pub(crate) fn new_budget(
    product_id: ProductId,
    expense_category_id: ReferenceId,
    day_number: Option<u32>,
) -> NewBudget {
    NewBudget {
        product_id,
        expense_category_id,
        day_number,
        expense_title: "Hotel".to_owned(),
        expense_code: None,
        currency_id: None,
        tax_id: None,
        department_id: None,
        sales_tax_group_id: None,
        payment_type_id: None,
        passenger_costs: [None; PASSENGER_COST_COLUMNS],
        leader_costs: [None; LEADER_COST_COLUMNS],
        total_budget: Decimal::ZERO,
    }
}
