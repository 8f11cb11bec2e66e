use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Url;

use crate::error::{AppError, Context};
use crate::records::Frequency;

use super::{CredentialProvider, FetchResult};

/// Everything that varies between two history downloads.
#[derive(Debug, Clone)]
pub struct HistoryRequest<'a> {
    pub symbol: &'a str,
    pub exchange_suffix: Option<&'a str>,
    pub frequency: Frequency,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Builds download URLs for the provider's history endpoint.
#[derive(Clone)]
pub struct RequestBuilder {
    endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl RequestBuilder {
    pub fn new(endpoint: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn build(&self, request: &HistoryRequest<'_>) -> FetchResult<Url> {
        let symbol = request.symbol.trim();
        if symbol.is_empty() {
            return Err(AppError::validation("symbol missing"));
        }

        let path_symbol = match request.exchange_suffix {
            Some(suffix) if !suffix.is_empty() => format!("{symbol}.{suffix}"),
            _ => symbol.to_string(),
        };

        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid history endpoint {}", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::message(format!("History endpoint {} has no path", self.endpoint))
            })?
            .pop_if_empty()
            .push(&path_symbol);

        // crumb must match the session cookie sent by the fetcher
        let query = format!(
            "period1={start}&period2={end}&interval={interval}&events=history&crumb={crumb}",
            start = request.start.timestamp(),
            end = request.end.timestamp(),
            interval = request.frequency.interval_code(),
            crumb = self.credentials.crumb(),
        );
        url.set_query(Some(&query));

        Ok(url)
    }
}
