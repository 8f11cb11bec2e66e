use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};

use super::Frequency;

/// Tag carried by the typed job envelope.
pub const SINCE_DATE_REQUEST: &str = "CandlesSinceDateRequest";

/// Time span a job asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSpan {
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Open-ended span whose end is "now" at the time the job runs.
    Since { date: DateTime<Utc> },
}

/// A validated work request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub symbol: String,
    pub frequency: Frequency,
    pub span: JobSpan,
    pub product_id: Option<Uuid>,
    pub exchange: Option<String>,
}

impl Job {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(AppError::validation("symbol missing"));
        }
        if let JobSpan::Range { start, end } = &self.span {
            ensure_ordered(*start, *end)?;
        }
        Ok(())
    }

    /// Concrete `(start, end)` pair for a fetch happening at `now`.
    pub fn resolve_span(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let (start, end) = match self.span {
            JobSpan::Range { start, end } => (start, end),
            JobSpan::Since { date } => (date, now),
        };
        ensure_ordered(start, end)?;
        Ok((start, end))
    }
}

fn ensure_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start > end {
        return Err(AppError::validation(format!(
            "span start {} is after end {}",
            start.to_rfc3339(),
            end.to_rfc3339()
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LegacyJob {
    symbol: String,
    frequency: Frequency,
    range: LegacyRange,
}

#[derive(Debug, Deserialize)]
struct LegacyRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SinceDateRequest {
    #[serde(default)]
    product_id: Option<Uuid>,
    symbol: String,
    #[serde(default)]
    exchange: Option<String>,
    frequency: Frequency,
    date: DateTime<Utc>,
}

/// Decode an inbound payload in either the legacy or the typed shape.
///
/// Payloads with a `type` field must carry the since-date tag; everything
/// else is read as a legacy range job.
pub fn decode_job(payload: &[u8]) -> Result<Job> {
    let root: Value = serde_json::from_slice(payload)
        .map_err(|err| AppError::validation(format!("malformed job JSON: {err}")))?;

    let job = match root.get("type") {
        Some(tag) => decode_typed(tag, &root)?,
        None => decode_legacy(root)?,
    };

    job.validate()?;
    Ok(job)
}

fn decode_typed(tag: &Value, root: &Value) -> Result<Job> {
    let Some(tag) = tag.as_str() else {
        return Err(AppError::validation("job `type` must be a string"));
    };
    if tag != SINCE_DATE_REQUEST {
        return Err(AppError::validation(format!("unrecognized job type `{tag}`")));
    }

    let data = root
        .get("data")
        .cloned()
        .ok_or_else(|| AppError::validation(format!("`{tag}` job is missing `data`")))?;
    let request: SinceDateRequest = serde_json::from_value(data)
        .map_err(|err| AppError::validation(format!("invalid `{tag}` job: {err}")))?;

    Ok(Job {
        symbol: request.symbol,
        frequency: request.frequency,
        span: JobSpan::Since { date: request.date },
        product_id: request.product_id,
        exchange: request
            .exchange
            .map(|exchange| exchange.trim().to_string())
            .filter(|exchange| !exchange.is_empty()),
    })
}

fn decode_legacy(root: Value) -> Result<Job> {
    let legacy: LegacyJob = serde_json::from_value(root)
        .map_err(|err| AppError::validation(format!("invalid range job: {err}")))?;

    Ok(Job {
        symbol: legacy.symbol,
        frequency: legacy.frequency,
        span: JobSpan::Range {
            start: legacy.range.start,
            end: legacy.range.end,
        },
        product_id: None,
        exchange: None,
    })
}
