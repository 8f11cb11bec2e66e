use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::records::{Candle, Frequency, Job, Row};

/// Job fields copied into every candle of that job.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyContext<'a> {
    pub symbol: &'a str,
    pub frequency: Frequency,
    pub product_id: Option<Uuid>,
}

impl<'a> From<&'a Job> for AssemblyContext<'a> {
    fn from(job: &'a Job) -> Self {
        Self {
            symbol: &job.symbol,
            frequency: job.frequency,
            product_id: job.product_id,
        }
    }
}

pub fn assemble(context: &AssemblyContext<'_>, row: &Row) -> Result<Candle> {
    if context.symbol.trim().is_empty() {
        return Err(AppError::validation("symbol missing"));
    }

    Ok(Candle {
        product_id: context.product_id,
        date: midnight_utc(row),
        frequency: context.frequency,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        symbol: context.symbol.to_string(),
        exchange: None,
        volume: row.volume,
    })
}

fn midnight_utc(row: &Row) -> DateTime<Utc> {
    row.date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn row() -> Row {
        Row {
            date: NaiveDate::from_ymd_opt(2018, 5, 1).unwrap(),
            open: 93.21,
            high: 99.99,
            low: 92.45,
            close: 98.84,
            volume: 606_000_000,
        }
    }

    #[test]
    fn carries_job_context() {
        let product_id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let context = AssemblyContext {
            symbol: "MSFT",
            frequency: Frequency::Month,
            product_id: Some(product_id),
        };

        let candle = assemble(&context, &row()).unwrap();

        assert_eq!(candle.symbol, "MSFT");
        assert_eq!(candle.frequency, Frequency::Month);
        assert_eq!(candle.product_id, Some(product_id));
        assert_eq!(candle.date, Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(candle.volume, 606_000_000);
        assert_eq!(candle.exchange, None);
    }

    #[test]
    fn refuses_empty_symbol() {
        let context = AssemblyContext {
            symbol: "",
            frequency: Frequency::Day,
            product_id: None,
        };
        assert!(assemble(&context, &row()).unwrap_err().is_validation());
    }
}
