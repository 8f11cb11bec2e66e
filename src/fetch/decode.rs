use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::records::Row;

use super::FetchResult;

/// date, open, high, low, close, adj close, volume
pub const HISTORY_FIELD_COUNT: usize = 7;
pub const HISTORY_DATE_FORMAT: &str = "%Y-%m-%d";

/// How many trailing rows to drop because the provider still considers them provisional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    pub trailing_rows: usize,
}

impl TrimPolicy {
    pub const fn keep_all() -> Self {
        Self { trailing_rows: 0 }
    }

    pub fn apply<T>(&self, rows: &mut Vec<T>) {
        let keep = rows.len().saturating_sub(self.trailing_rows);
        rows.truncate(keep);
    }
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self { trailing_rows: 2 }
    }
}

/// Decode the provider's comma-delimited history table.
///
/// The header row is skipped. Any malformed row fails the whole table so a
/// job never publishes a partial sequence.
pub fn decode_history(body: &str, policy: &TrimPolicy) -> FetchResult<Vec<Row>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| AppError::decode(err.to_string()))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        rows.push(parse_row(&record, line)?);
    }

    policy.apply(&mut rows);
    Ok(rows)
}

fn parse_row(record: &csv::StringRecord, line: u64) -> FetchResult<Row> {
    if record.len() != HISTORY_FIELD_COUNT {
        return Err(AppError::decode(format!(
            "line {line}: expected {HISTORY_FIELD_COUNT} fields but found {}",
            record.len()
        )));
    }

    let date = NaiveDate::parse_from_str(&record[0], HISTORY_DATE_FORMAT).map_err(|err| {
        AppError::decode(format!("line {line}: invalid date `{}`: {err}", &record[0]))
    })?;

    Ok(Row {
        date,
        open: parse_field(record, 1, "open", line)?,
        high: parse_field(record, 2, "high", line)?,
        low: parse_field(record, 3, "low", line)?,
        close: parse_field(record, 4, "close", line)?,
        volume: parse_field(record, 6, "volume", line)?,
    })
}

fn parse_field<T>(record: &csv::StringRecord, idx: usize, name: &str, line: u64) -> FetchResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = &record[idx];
    raw.parse::<T>()
        .map_err(|err| AppError::decode(format!("line {line}: invalid {name} `{raw}`: {err}")))
}
