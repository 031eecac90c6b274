//! Saves validated rows and collects the outcome of every row.

use rusqlite::Connection;

use crate::{
    Error,
    budget::{Budget, create_budget, find_budget_by_natural_key, get_budget, update_budget},
    budget_upload::{
        history::{ChangeKind, UploadId, record_budget_change},
        outcome::{BatchResult, UploadOutcome},
        validator::{ResolvedBudgetLine, ValidatedRow},
    },
    config::MatchPolicy,
};

/// Save every resolved row and report the outcome of each row in order.
///
/// Each row is written in its own transaction, so a row that fails, e.g. on a
/// duplicate natural key, is rolled back without affecting the rows around it.
/// Invalid rows are reported without touching the database.
///
/// **Note**: `connection` must not have a transaction open, otherwise every
/// row will fail.
pub fn commit_batch(
    rows: Vec<ValidatedRow>,
    match_policy: MatchPolicy,
    upload_id: Option<UploadId>,
    connection: &Connection,
) -> BatchResult {
    let mut results = Vec::with_capacity(rows.len());

    for row in rows {
        let outcome = match row {
            ValidatedRow::Invalid(invalid) => {
                tracing::debug!("Row {} is invalid: {}", invalid.row_number, invalid.reason);
                UploadOutcome::failure(invalid.row_number, invalid.display, invalid.reason)
            }
            ValidatedRow::Resolved(line) => {
                match commit_line(&line, match_policy, upload_id, connection) {
                    Ok(budget) => UploadOutcome::success(line.row_number, budget.id, line.display),
                    Err(error) => {
                        tracing::debug!("Could not save row {}: {error}", line.row_number);
                        UploadOutcome::failure(line.row_number, line.display, error.to_string())
                    }
                }
            }
        };

        results.push(outcome);
    }

    BatchResult::new(results)
}

fn commit_line(
    line: &ResolvedBudgetLine,
    match_policy: MatchPolicy,
    upload_id: Option<UploadId>,
    connection: &Connection,
) -> Result<Budget, Error> {
    let transaction = connection.unchecked_transaction()?;

    let (budget, change) = match find_existing_budget(line, match_policy, &transaction)? {
        Some(budget_id) => (
            update_budget(budget_id, &line.budget, &transaction)?,
            ChangeKind::Updated,
        ),
        None => (create_budget(&line.budget, &transaction)?, ChangeKind::Created),
    };

    if let Some(upload_id) = upload_id {
        record_budget_change(upload_id, budget.id, line.row_number, change, &transaction)?;
    }

    transaction.commit()?;

    Ok(budget)
}

/// Find the budget a line should update according to `match_policy`.
fn find_existing_budget(
    line: &ResolvedBudgetLine,
    match_policy: MatchPolicy,
    connection: &Connection,
) -> Result<Option<i64>, Error> {
    match line.budget_id {
        Some(budget_id) if match_policy.uses_id() => {
            let existing = get_budget(budget_id, connection).map_err(|error| match error {
                Error::NotFound => Error::UpdateMissingBudget(budget_id),
                error => error,
            })?;

            if existing.product_id != line.budget.product_id {
                return Err(Error::BudgetProductMismatch(budget_id));
            }

            Ok(Some(budget_id))
        }
        _ if match_policy.uses_natural_key() => {
            let existing = find_budget_by_natural_key(
                line.budget.product_id,
                line.budget.expense_category_id,
                line.budget.day_number,
                connection,
            )?;

            Ok(existing.map(|budget| budget.id))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod commit_batch_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        budget::{count_budgets, create_budget, get_budget},
        budget_upload::{
            committer::commit_batch,
            outcome::RowDisplay,
            validator::{InvalidRow, ResolvedBudgetLine, ValidatedRow},
        },
        config::MatchPolicy,
        test_utils::{get_seeded_connection, new_budget},
    };

    fn resolved(row_number: usize, day_number: Option<u32>) -> ValidatedRow {
        let mut budget = new_budget(1, 1, day_number);
        budget.total_budget = dec!(10);

        ValidatedRow::Resolved(ResolvedBudgetLine {
            row_number,
            budget_id: None,
            budget,
            display: RowDisplay::default(),
        })
    }

    fn resolved_with_id(row_number: usize, budget_id: i64, day_number: Option<u32>) -> ValidatedRow {
        match resolved(row_number, day_number) {
            ValidatedRow::Resolved(line) => ValidatedRow::Resolved(ResolvedBudgetLine {
                budget_id: Some(budget_id),
                ..line
            }),
            invalid => invalid,
        }
    }

    fn invalid(row_number: usize) -> ValidatedRow {
        ValidatedRow::Invalid(InvalidRow {
            row_number,
            display: RowDisplay::default(),
            reason: "ExpenseTitle is required".to_owned(),
        })
    }

    #[test]
    fn invalid_rows_are_reported_and_not_saved() {
        let connection = get_seeded_connection();

        let result = commit_batch(
            vec![resolved(1, Some(1)), invalid(2), resolved(3, Some(3))],
            MatchPolicy::default(),
            None,
            &connection,
        );

        let numbers: Vec<usize> = result.results.iter().map(|outcome| outcome.row_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(result.results[0].is_success);
        assert!(!result.results[1].is_success);
        assert_eq!(result.results[1].error_message, "ExpenseTitle is required");
        assert!(result.results[2].is_success);
        assert!(result.upload_status);
        assert_eq!(count_budgets(&connection), Ok(2));
    }

    #[test]
    fn natural_key_updates_instead_of_duplicating() {
        let connection = get_seeded_connection();
        let first = commit_batch(vec![resolved(1, Some(1))], MatchPolicy::NaturalKey, None, &connection);

        let second = commit_batch(vec![resolved(1, Some(1))], MatchPolicy::NaturalKey, None, &connection);

        assert!(second.results[0].is_success);
        assert_eq!(first.results[0].id, second.results[0].id);
        assert_eq!(count_budgets(&connection), Ok(1));
    }

    #[test]
    fn repeated_natural_key_within_a_batch_updates_the_first_row() {
        let connection = get_seeded_connection();

        let result = commit_batch(
            vec![resolved(1, Some(1)), resolved(2, Some(1))],
            MatchPolicy::default(),
            None,
            &connection,
        );

        assert!(result.results.iter().all(|outcome| outcome.is_success));
        assert_eq!(result.results[0].id, result.results[1].id);
        assert_eq!(count_budgets(&connection), Ok(1));
    }

    #[test]
    fn explicit_id_updates_the_named_budget() {
        let connection = get_seeded_connection();
        let existing = create_budget(&new_budget(1, 1, Some(5)), &connection).unwrap();

        let result = commit_batch(
            vec![resolved_with_id(1, existing.id, Some(6))],
            MatchPolicy::ExplicitId,
            None,
            &connection,
        );

        assert!(result.results[0].is_success);
        assert_eq!(result.results[0].id, Some(existing.id));
        let updated = get_budget(existing.id, &connection).unwrap();
        assert_eq!(updated.day_number, Some(6));
        assert_eq!(count_budgets(&connection), Ok(1));
    }

    #[test]
    fn explicit_id_policy_reports_uniqueness_violations() {
        let connection = get_seeded_connection();
        create_budget(&new_budget(1, 1, Some(1)), &connection).unwrap();

        let result = commit_batch(
            vec![resolved(1, Some(1)), resolved(2, Some(2))],
            MatchPolicy::ExplicitId,
            None,
            &connection,
        );

        assert!(!result.results[0].is_success);
        assert_eq!(
            result.results[0].error_message,
            Error::DuplicateBudget.to_string()
        );
        assert!(result.results[1].is_success);
        assert_eq!(count_budgets(&connection), Ok(2));
    }

    #[test]
    fn missing_explicit_id_fails_the_row() {
        let connection = get_seeded_connection();

        let result = commit_batch(
            vec![resolved_with_id(1, 77, Some(1))],
            MatchPolicy::IdThenNaturalKey,
            None,
            &connection,
        );

        assert!(!result.results[0].is_success);
        assert_eq!(
            result.results[0].error_message,
            Error::UpdateMissingBudget(77).to_string()
        );
        assert_eq!(count_budgets(&connection), Ok(0));
    }

    #[test]
    fn natural_key_policy_ignores_explicit_id() {
        let connection = get_seeded_connection();

        let result = commit_batch(
            vec![resolved_with_id(1, 77, Some(1))],
            MatchPolicy::NaturalKey,
            None,
            &connection,
        );

        assert!(result.results[0].is_success);
        assert_eq!(count_budgets(&connection), Ok(1));
    }

    #[test]
    fn failed_row_is_rolled_back() {
        let connection = get_seeded_connection();
        let mut budget = new_budget(1, 1, Some(1));
        budget.currency_id = Some(999);
        let line = ValidatedRow::Resolved(ResolvedBudgetLine {
            row_number: 1,
            budget_id: None,
            budget,
            display: RowDisplay::default(),
        });

        let result = commit_batch(vec![line], MatchPolicy::default(), None, &connection);

        assert!(!result.results[0].is_success);
        assert!(!result.upload_status);
        assert_eq!(count_budgets(&connection), Ok(0));
    }
}
