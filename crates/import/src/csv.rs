use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tally_core::{Money, NewTransaction, Transaction};
use thiserror::Error;

/// Positional column mapping for a bank statement export.
///
/// Negative indices count back from the last column, so `-1` is the final
/// column of each record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementLayout {
    pub date_column: isize,
    pub description_column: isize,
    pub reference_column: Option<isize>,
    pub particulars_column: Option<isize>,
    pub code_column: Option<isize>,
    pub amount_column: isize,
    pub balance_column: isize,
    pub date_format: String,
    pub has_header: bool,
    pub delimiter: String,
}

impl Default for StatementLayout {
    fn default() -> Self {
        Self {
            date_column: 1,
            description_column: 2,
            reference_column: Some(4),
            particulars_column: Some(5),
            code_column: Some(6),
            amount_column: -2,
            balance_column: -1,
            date_format: "%d-%m-%Y".to_string(),
            has_header: true,
            delimiter: ",".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Line {line}: missing column {column}")]
    MissingColumn { line: u64, column: isize },
    #[error("Line {line}: invalid date {value:?}")]
    InvalidDate { line: u64, value: String },
    #[error("Line {line}: invalid amount {value:?}")]
    InvalidAmount { line: u64, value: String },
}

fn resolve(column: isize, len: usize) -> Option<usize> {
    if column >= 0 {
        let idx = column as usize;
        (idx < len).then_some(idx)
    } else {
        len.checked_sub(column.unsigned_abs())
    }
}

fn field<'r>(record: &'r csv::StringRecord, column: isize, line: u64) -> Result<&'r str, StatementError> {
    resolve(column, record.len())
        .and_then(|idx| record.get(idx))
        .ok_or(StatementError::MissingColumn { line, column })
}

fn optional_field(record: &csv::StringRecord, column: Option<isize>) -> Option<String> {
    column
        .and_then(|c| resolve(c, record.len()))
        .and_then(|idx| record.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_money(value: &str, line: u64) -> Result<Money, StatementError> {
    value.parse::<Money>().map_err(|_| StatementError::InvalidAmount {
        line,
        value: value.to_string(),
    })
}

pub fn parse_row(
    record: &csv::StringRecord,
    layout: &StatementLayout,
    account: &str,
) -> Result<Transaction, StatementError> {
    let line = record.position().map_or(0, |p| p.line());

    let raw_date = field(record, layout.date_column, line)?.trim();
    let date = NaiveDate::parse_from_str(raw_date, &layout.date_format).map_err(|_| {
        StatementError::InvalidDate {
            line,
            value: raw_date.to_string(),
        }
    })?;

    Ok(NewTransaction {
        description: field(record, layout.description_column, line)?.trim().to_string(),
        particulars: optional_field(record, layout.particulars_column),
        code: optional_field(record, layout.code_column),
        reference: optional_field(record, layout.reference_column),
        amount: parse_money(field(record, layout.amount_column, line)?, line)?,
        date,
        balance: parse_money(field(record, layout.balance_column, line)?, line)?,
        account: account.to_string(),
    }
    .into_transaction())
}

/// Parses a whole statement; a single bad row fails the file.
pub fn parse_statement<R: Read>(
    data: R,
    layout: &StatementLayout,
    account: &str,
) -> Result<Vec<Transaction>, StatementError> {
    let delimiter = layout.delimiter.as_bytes().first().copied().unwrap_or(b',');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(layout.has_header)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(data);

    let mut transactions = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        transactions.push(parse_row(&record, layout, account)?);
    }
    Ok(transactions)
}
