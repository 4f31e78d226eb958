use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use ledgerlens_core::TransactionRow;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column(s) {missing:?}; found {found:?}")]
    MissingColumns { missing: Vec<String>, found: Vec<String> },
    #[error("no data rows")]
    NoDataRows,
}

const REQUIRED_COLUMNS: [&str; 3] = ["merchant", "amount", "date"];
const OPTIONAL_COLUMNS: [&str; 2] = ["description", "transaction_id"];

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn field(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a bank amount string. Handles `$`, thousands separators, and
/// accounting-style parentheses for negatives. Returns `None` for anything
/// that is not a number so the caller can drop the row rather than invent
/// a zero.
fn parse_row_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned = s.replace([',', '$', ' '], "");
    let value: f64 = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Read bank transactions from CSV data.
///
/// Headers are matched case-insensitively after trimming. `merchant`,
/// `amount`, and `date` are required; `description` and `transaction_id`
/// are carried through when present. Blank rows are skipped, unparseable
/// amounts become `None` on the row (the ranker drops those), and a file
/// with headers but no rows is an error.
pub fn read_transactions<R: Read>(data: R) -> Result<Vec<TransactionRow>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| column_index(&headers, name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingColumns { missing, found: headers });
    }

    let merchant_col = column_index(&headers, "merchant");
    let amount_col = column_index(&headers, "amount");
    let date_col = column_index(&headers, "date");
    let description_col = column_index(&headers, OPTIONAL_COLUMNS[0]);
    let transaction_id_col = column_index(&headers, OPTIONAL_COLUMNS[1]);

    let mut rows: Vec<TransactionRow> = Vec::new();
    let mut bad_amounts = 0usize;
    let mut blank_rows = 0usize;

    for result in reader.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            blank_rows += 1;
            continue;
        }

        let amount_raw = field(&record, amount_col);
        let amount = amount_raw.as_deref().and_then(parse_row_amount);
        if amount_raw.is_some() && amount.is_none() {
            bad_amounts += 1;
        }

        rows.push(TransactionRow {
            merchant: field(&record, merchant_col),
            amount,
            date: field(&record, date_col),
            description: field(&record, description_col),
            transaction_id: field(&record, transaction_id_col),
        });
    }

    if rows.is_empty() {
        return Err(CsvError::NoDataRows);
    }

    if bad_amounts > 0 {
        warn!(bad_amounts, "csv import: rows with unparseable amount field");
    }
    info!(rows = rows.len(), blank_rows, "csv import complete");
    Ok(rows)
}

/// Read bank transactions from a CSV file on disk.
pub fn read_transactions_file(path: impl AsRef<Path>) -> Result<Vec<TransactionRow>, CsvError> {
    let file = File::open(path.as_ref())?;
    read_transactions(file)
}
