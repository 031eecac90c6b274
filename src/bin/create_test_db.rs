use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use trip_budgets::{
    MatchPolicy, ReferenceCategory, ReferenceCode, create_product, create_reference,
    initialize_db, process_budget_upload,
};

/// A utility for creating a test database for the trip budgets server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const REFERENCE_DATA: [(ReferenceCategory, &str, &str); 10] = [
    (ReferenceCategory::Currency, "NZD", "New Zealand dollar"),
    (ReferenceCategory::Currency, "AUD", "Australian dollar"),
    (ReferenceCategory::Department, "OPS", "Operations"),
    (ReferenceCategory::Tax, "GST", "Goods and services tax"),
    (ReferenceCategory::Tax, "EXEMPT", "Tax exempt"),
    (ReferenceCategory::SalesTaxGroup, "NZGST", "New Zealand GST"),
    (ReferenceCategory::PaymentType, "Card", "Credit card"),
    (ReferenceCategory::ExpenseCategory, "ACCOM", "Accommodation"),
    (ReferenceCategory::ExpenseCategory, "MEALS", "Meals"),
    (ReferenceCategory::ExpenseCategory, "TRANS", "Transport"),
];

const SAMPLE_BUDGETS: &str = "\
DayNumber,ExpenseTitle,ExpenseCode,CurrencyCode,PaymentType,SalesTaxCode,SalesTaxGroup,DepartmentCode,PassengerCost_1,PassengerCost_2,LeaderCost_1
1,Christchurch hotel,ACCOM,NZD,Card,GST,NZGST,OPS,180,160,90
1,Welcome dinner,MEALS,NZD,Card,GST,NZGST,OPS,65.50,65.50,0
2,Coach to Tekapo,TRANS,NZD,Card,GST,NZGST,OPS,120,,
";

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating reference data...");

    for (category, code, name) in REFERENCE_DATA {
        create_reference(category, ReferenceCode::new(code)?, name, &conn)?;
    }

    println!("Creating test product...");

    let product = create_product(
        ReferenceCode::new("NZ-SOUTH-14")?,
        "South Island in 14 days",
        &conn,
    )?;

    println!("Uploading sample budgets...");

    let result = process_budget_upload(
        "sample.csv",
        SAMPLE_BUDGETS.as_bytes(),
        Some(product.id),
        MatchPolicy::default(),
        &conn,
    )?;

    for outcome in result.results.iter().filter(|outcome| !outcome.is_success) {
        eprintln!("Row {} failed: {}", outcome.row_number, outcome.error_message);
    }

    println!("Success!");

    Ok(())
}
