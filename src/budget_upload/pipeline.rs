//! Runs an upload through the parser, validator and committer.

use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

use numfmt::{Formatter, Precision};
use rusqlite::Connection;

use crate::{
    Error,
    budget_upload::{
        committer::commit_batch,
        history::{count_budget_changes, create_upload_record, finish_upload_record},
        outcome::BatchResult,
        parser::RowParser,
        validator::{ValidatedRow, validate_row},
    },
    config::MatchPolicy,
    product::ProductId,
    reference::ReferenceData,
};

/// Create or update the budgets described by the CSV file `data`.
///
/// Every row is parsed and validated before anything is written, so a file
/// that cannot be decoded leaves the database untouched. After that each
/// valid row is saved on its own and the outcome of every row, saved or not,
/// is returned in file order.
///
/// `product_id` is applied to every row. When it is `None` every row fails
/// with "ProductId is required".
///
/// **Note**: `connection` must not have a transaction open, each row is
/// saved in its own transaction.
///
/// # Errors
/// Returns [Error::InvalidCSV] if the file cannot be decoded, or an SQL
/// error if the reference data or upload record cannot be read or written.
pub fn process_budget_upload(
    file_name: &str,
    data: &[u8],
    product_id: Option<ProductId>,
    match_policy: MatchPolicy,
    connection: &Connection,
) -> Result<BatchResult, Error> {
    let start_time = Instant::now();
    let reference = ReferenceData::load(connection)?;

    let rows = RowParser::new(data, product_id)?
        .map(|maybe_row| maybe_row.map(|row| validate_row(row, &reference, match_policy)))
        .collect::<Result<Vec<ValidatedRow>, Error>>()
        .inspect_err(|error| tracing::debug!("Rejected upload '{file_name}': {error}"))?;

    if rows.is_empty() {
        tracing::info!("Upload '{file_name}' has no data rows");
        return Ok(BatchResult::empty());
    }

    let upload_id = create_upload_record(file_name, product_id, match_policy, connection)?;
    let result = commit_batch(rows, match_policy, Some(upload_id), connection);

    if let Err(error) = finish_upload_record(upload_id, &result, connection) {
        tracing::error!("Could not store the row counts for upload {upload_id}: {error}");
    }

    match count_budget_changes(upload_id, connection) {
        Ok((created, updated)) => {
            log_summary(file_name, &result, created, updated, start_time.elapsed())
        }
        Err(error) => tracing::error!("Could not count the changes for upload {upload_id}: {error}"),
    }

    Ok(result)
}

fn log_summary(
    file_name: &str,
    result: &BatchResult,
    created: usize,
    updated: usize,
    duration: Duration,
) {
    let formatter = get_thousands_separator_formatter();
    let row_count = formatter.fmt_string(result.results.len());
    let created = formatter.fmt_string(created);
    let updated = formatter.fmt_string(updated);
    let failure_count = formatter.fmt_string(result.failure_count());
    let duration_ms = formatter.fmt_string(duration.as_millis());

    tracing::info!(
        "Upload '{file_name}' completed in {duration_ms}ms: {row_count} rows, \
        {created} created, {updated} updated, {failure_count} failed"
    );
}

fn get_thousands_separator_formatter() -> &'static Formatter {
    static FORMATTER: OnceLock<Formatter> = OnceLock::new();

    FORMATTER.get_or_init(|| {
        Formatter::new()
            .separator(',')
            .unwrap()
            .precision(Precision::Decimals(0))
    })
}

#[cfg(test)]
mod process_budget_upload_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        budget::{count_budgets, get_budget, get_budgets_for_product},
        budget_upload::history::get_recent_uploads,
        config::MatchPolicy,
        test_utils::get_seeded_connection,
    };

    use super::process_budget_upload;

    const HEADER: &str = "DayNumber,ExpenseTitle,ExpenseCode,CurrencyCode,PaymentType,\
        SalesTaxCode,SalesTaxGroup,DepartmentCode,PassengerCost_1,PassengerCost_2";

    fn upload(data: &str) -> Vec<u8> {
        format!("{HEADER}\n{data}").into_bytes()
    }

    #[test]
    fn saves_a_valid_row() {
        let connection = get_seeded_connection();
        let data = upload("1,Hotel,ACCOM,NZD,Card,GST,NZGST,OPS,100,50");

        let result = process_budget_upload(
            "budgets.csv",
            &data,
            Some(1),
            MatchPolicy::default(),
            &connection,
        )
        .expect("Could not process upload");

        assert!(result.upload_status);
        assert_eq!(result.results.len(), 1);
        let outcome = &result.results[0];
        assert!(outcome.is_success, "{}", outcome.error_message);
        assert_eq!(outcome.row_number, 1);
        assert_eq!(outcome.error_message, "");
        let budget = get_budget(outcome.id.unwrap(), &connection).unwrap();
        assert_eq!(budget.expense_code.as_deref(), Some("ACCOM-01"));
        assert_eq!(budget.total_budget, dec!(150));
        assert_eq!(budget.expense_title, "Hotel");
    }

    #[test]
    fn missing_title_fails_the_row() {
        let connection = get_seeded_connection();
        let data = upload("1,,ACCOM,NZD,Card,GST,NZGST,OPS,100,50");

        let result =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection)
                .unwrap();

        assert!(!result.upload_status);
        assert!(!result.results[0].is_success);
        assert!(
            result.results[0]
                .error_message
                .contains("ExpenseTitle is required")
        );
        assert_eq!(count_budgets(&connection), Ok(0));
    }

    #[test]
    fn unknown_currency_fails_only_its_row() {
        let connection = get_seeded_connection();
        let data = upload(
            "1,Hotel,ACCOM,NZD,Card,GST,NZGST,OPS,100,\n\
            2,Hotel,ACCOM,XYZ,Card,GST,NZGST,OPS,100,",
        );

        let result =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection)
                .unwrap();

        assert!(result.upload_status);
        assert!(result.results[0].is_success);
        assert!(!result.results[1].is_success);
        assert!(result.results[1].error_message.contains("XYZ"));
        assert_eq!(count_budgets(&connection), Ok(1));
    }

    #[test]
    fn reuploading_a_file_updates_instead_of_duplicating() {
        let connection = get_seeded_connection();
        let data = upload(
            "1,Hotel,ACCOM,NZD,Card,GST,NZGST,OPS,100,\n\
            2,Hotel,ACCOM,NZD,Card,GST,NZGST,OPS,120,",
        );

        let first =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection)
                .unwrap();
        let second =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection)
                .unwrap();

        assert!(second.results.iter().all(|outcome| outcome.is_success));
        let first_ids: Vec<_> = first.results.iter().map(|outcome| outcome.id).collect();
        let second_ids: Vec<_> = second.results.iter().map(|outcome| outcome.id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(count_budgets(&connection), Ok(2));
    }

    #[test]
    fn rows_are_numbered_in_file_order() {
        let connection = get_seeded_connection();
        let data = upload(
            "1,Hotel,ACCOM,NZD,,,,,1,\n\
            \n\
            2,,ACCOM,NZD,,,,,1,\n\
            3,Hotel,ACCOM,NZD,,,,,1,",
        );

        let result =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection)
                .unwrap();

        let numbers: Vec<usize> = result
            .results
            .iter()
            .map(|outcome| outcome.row_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn total_is_rounded_half_away_from_zero() {
        let connection = get_seeded_connection();
        let data = upload("1,Hotel,ACCOM,NZD,,,,,10.005,5");

        let result =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection)
                .unwrap();

        let budget = get_budget(result.results[0].id.unwrap(), &connection).unwrap();
        assert_eq!(budget.total_budget, dec!(15.01));
    }

    #[test]
    fn header_only_file_saves_nothing() {
        let connection = get_seeded_connection();

        let result = process_budget_upload(
            "a.csv",
            HEADER.as_bytes(),
            Some(1),
            MatchPolicy::default(),
            &connection,
        )
        .unwrap();

        assert!(!result.upload_status);
        assert!(result.results.is_empty());
        assert!(get_recent_uploads(10, &connection).unwrap().is_empty());
    }

    #[test]
    fn missing_product_fails_every_row() {
        let connection = get_seeded_connection();
        let data = upload(
            "1,Hotel,ACCOM,NZD,,,,,1,\n\
            2,Hotel,ACCOM,NZD,,,,,1,",
        );

        let result =
            process_budget_upload("a.csv", &data, None, MatchPolicy::default(), &connection)
                .unwrap();

        assert!(!result.upload_status);
        assert!(
            result
                .results
                .iter()
                .all(|outcome| outcome.error_message.contains("ProductId is required"))
        );
    }

    #[test]
    fn undecodable_file_saves_nothing() {
        let connection = get_seeded_connection();
        let mut data = upload("1,Hotel,ACCOM,NZD,,,,,1,\n");
        data.extend_from_slice(b"2,\xff\xfe,ACCOM,NZD,,,,,1,\n");

        let result =
            process_budget_upload("a.csv", &data, Some(1), MatchPolicy::default(), &connection);

        assert!(matches!(result, Err(Error::InvalidCSV(_))));
        assert_eq!(count_budgets(&connection), Ok(0));
        assert!(get_recent_uploads(10, &connection).unwrap().is_empty());
    }

    #[test]
    fn natural_key_policy_ignores_id_column() {
        let connection = get_seeded_connection();
        let data = b"Id,DayNumber,ExpenseTitle,ExpenseCode\n\
            abc,1,Hotel,ACCOM\n\
            0,2,Hotel,ACCOM";

        let result =
            process_budget_upload("a.csv", data, Some(1), MatchPolicy::NaturalKey, &connection)
                .unwrap();

        for outcome in &result.results {
            assert!(outcome.is_success, "row {}: {}", outcome.row_number, outcome.error_message);
        }
        assert_eq!(count_budgets(&connection), Ok(2));
    }

    #[test]
    fn id_policy_rejects_malformed_id() {
        let connection = get_seeded_connection();
        let data = b"Id,DayNumber,ExpenseTitle,ExpenseCode\nabc,1,Hotel,ACCOM";

        let result =
            process_budget_upload("a.csv", data, Some(1), MatchPolicy::IdThenNaturalKey, &connection)
                .unwrap();

        assert!(!result.results[0].is_success);
        assert!(result.results[0].error_message.contains("Id \"abc\""));
    }

    #[test]
    fn upload_is_recorded() {
        let connection = get_seeded_connection();
        let data = upload(
            "1,Hotel,ACCOM,NZD,,,,,1,\n\
            2,,ACCOM,NZD,,,,,1,",
        );

        process_budget_upload("trip.csv", &data, Some(1), MatchPolicy::NaturalKey, &connection)
            .unwrap();

        let uploads = get_recent_uploads(10, &connection).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].file_name, "trip.csv");
        assert_eq!(uploads[0].row_count, 2);
        assert_eq!(uploads[0].success_count, 1);
        assert_eq!(uploads[0].failure_count, 1);
        assert_eq!(get_budgets_for_product(1, &connection).unwrap().len(), 1);
    }
}
