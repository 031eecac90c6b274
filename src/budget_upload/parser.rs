//! Reads an uploaded CSV file into [UploadRow]s, one row at a time.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};

use crate::{
    Error,
    budget_upload::row::{Column, UploadRow},
    product::ProductId,
};

/// A lazy, single-pass iterator over the data rows of a budget upload.
///
/// The header row is read when the parser is created and is used to map each
/// cell to its [Column]. The iterator stops after the first error, which is
/// always an [Error::InvalidCSV].
pub struct RowParser<R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: Vec<Option<Column>>,
    product_id: Option<ProductId>,
    rows_read: usize,
    failed: bool,
}

impl<R: Read> RowParser<R> {
    /// Read the header row from `reader`.
    ///
    /// `product_id` is stamped on every row produced by the parser.
    ///
    /// # Errors
    /// Returns [Error::InvalidCSV] if the header cannot be decoded, names an
    /// unknown column or names a column twice.
    pub fn new(reader: R, product_id: Option<ProductId>) -> Result<Self, Error> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|error| Error::InvalidCSV(format!("could not read the header row: {error}")))?;
        let columns = parse_header(headers)?;

        Ok(Self {
            records: reader.into_records(),
            columns,
            product_id,
            rows_read: 0,
            failed: false,
        })
    }

    fn build_row(&self, record: &StringRecord) -> UploadRow {
        let mut row = UploadRow {
            row_number: self.rows_read,
            product_id: self.product_id,
            ..Default::default()
        };

        for (column, value) in self.columns.iter().zip(record.iter()) {
            match column {
                Some(column) if !value.is_empty() => row.set(*column, value.to_owned()),
                _ => {}
            }
        }

        row
    }
}

impl<R: Read> Iterator for RowParser<R> {
    type Item = Result<UploadRow, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(error) => {
                    self.failed = true;
                    return Some(Err(Error::InvalidCSV(format!(
                        "could not read the row after row {}: {error}",
                        self.rows_read
                    ))));
                }
            };

            // Rows of empty cells, e.g. ",,,", are treated like blank lines.
            if record.iter().all(str::is_empty) {
                continue;
            }

            self.rows_read += 1;
            return Some(Ok(self.build_row(&record)));
        }
    }
}

fn parse_header(headers: &StringRecord) -> Result<Vec<Option<Column>>, Error> {
    let mut columns: Vec<Option<Column>> = Vec::with_capacity(headers.len());

    for (index, name) in headers.iter().enumerate() {
        let name = if index == 0 {
            name.trim_start_matches('\u{feff}').trim()
        } else {
            name
        };

        // Spreadsheets often export trailing delimiters, which give unnamed columns.
        if name.is_empty() {
            columns.push(None);
            continue;
        }

        let column = Column::from_header(name)
            .ok_or_else(|| Error::InvalidCSV(format!("unknown column \"{name}\"")))?;

        if columns.contains(&Some(column)) {
            return Err(Error::InvalidCSV(format!(
                "column \"{name}\" appears more than once"
            )));
        }

        columns.push(Some(column));
    }

    Ok(columns)
}

#[cfg(test)]
mod row_parser_tests {
    use crate::{
        Error,
        budget_upload::{parser::RowParser, row::UploadRow},
    };

    fn parse(text: &[u8]) -> Result<Vec<UploadRow>, Error> {
        RowParser::new(text, Some(7))?.collect()
    }

    #[test]
    fn header_is_not_emitted_as_a_row() {
        let rows = parse(b"DayNumber,ExpenseTitle,ExpenseCode\n1,Hotel,ACCOM\n").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day_number.as_deref(), Some("1"));
        assert_eq!(rows[0].expense_title.as_deref(), Some("Hotel"));
        assert_eq!(rows[0].expense_code.as_deref(), Some("ACCOM"));
    }

    #[test]
    fn product_id_is_stamped_on_every_row() {
        let rows = parse(b"ExpenseTitle\nHotel\nDinner\n").unwrap();

        assert!(rows.iter().all(|row| row.product_id == Some(7)));
    }

    #[test]
    fn rows_are_numbered_from_one_skipping_blank_lines() {
        let rows = parse(b"ExpenseTitle,ExpenseCode\nA,X\n\n,\nB,Y\nC,Z\n").unwrap();

        let numbers: Vec<usize> = rows.iter().map(|row| row.row_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(rows[1].expense_title.as_deref(), Some("B"));
    }

    #[test]
    fn cells_are_trimmed_and_blank_cells_are_none() {
        let rows = parse(b"ExpenseTitle , CurrencyCode,DepartmentCode\n  Hotel  ,  , OPS\n").unwrap();

        assert_eq!(rows[0].expense_title.as_deref(), Some("Hotel"));
        assert_eq!(rows[0].currency_code, None);
        assert_eq!(rows[0].department_code.as_deref(), Some("OPS"));
    }

    #[test]
    fn columns_can_appear_in_any_order() {
        let rows = parse(b"LeaderCost_2,PassengerCost_1,ExpenseTitle\n3.50,10,Bus\n").unwrap();

        assert_eq!(rows[0].leader_costs[1].as_deref(), Some("3.50"));
        assert_eq!(rows[0].passenger_costs[0].as_deref(), Some("10"));
    }

    #[test]
    fn short_rows_leave_missing_cells_blank() {
        let rows = parse(b"ExpenseTitle,ExpenseCode,CurrencyCode\nHotel\n").unwrap();

        assert_eq!(rows[0].expense_title.as_deref(), Some("Hotel"));
        assert_eq!(rows[0].expense_code, None);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let rows = parse(b"\xEF\xBB\xBFExpenseTitle,ExpenseCode\nHotel,ACCOM\n").unwrap();

        assert_eq!(rows[0].expense_title.as_deref(), Some("Hotel"));
    }

    #[test]
    fn trailing_unnamed_columns_are_ignored() {
        let rows = parse(b"ExpenseTitle,ExpenseCode,,\nHotel,ACCOM,junk,\n").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].expense_code.as_deref(), Some("ACCOM"));
    }

    #[test]
    fn empty_file_has_no_rows() {
        assert!(parse(b"").unwrap().is_empty());
    }

    #[test]
    fn header_only_file_has_no_rows() {
        assert!(parse(b"DayNumber,ExpenseTitle,ExpenseCode\n").unwrap().is_empty());
    }

    #[test]
    fn unknown_column_is_fatal() {
        let result = RowParser::new(&b"ExpenseTitle,Colour\nHotel,Red\n"[..], Some(1));

        assert!(matches!(result, Err(Error::InvalidCSV(message)) if message.contains("Colour")));
    }

    #[test]
    fn duplicate_column_is_fatal() {
        let result = RowParser::new(&b"ExpenseTitle,ExpenseTitle\nA,B\n"[..], Some(1));

        assert!(matches!(result, Err(Error::InvalidCSV(_))));
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        let result = parse(b"ExpenseTitle,ExpenseCode\nHotel,ACCOM\n\xFF\xFE,ACCOM\n");

        assert!(matches!(result, Err(Error::InvalidCSV(_))));
    }

    #[test]
    fn iteration_stops_after_an_error() {
        let mut parser =
            RowParser::new(&b"ExpenseTitle\n\xFF\nHotel\n"[..], Some(1)).unwrap();

        assert!(matches!(parser.next(), Some(Err(Error::InvalidCSV(_)))));
        assert!(parser.next().is_none());
    }
}
