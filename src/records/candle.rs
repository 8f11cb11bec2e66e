use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::Frequency;

/// One decoded line of the provider table. Never leaves the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: NaiveDate,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    pub volume: u64,
}

/// Outbound OHLCV record, published once and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub product_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub frequency: Frequency,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    pub symbol: String,
    #[serde(serialize_with = "empty_when_unset")]
    pub exchange: Option<String>,
    pub volume: u64,
}

impl Candle {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

fn empty_when_unset<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}
