use std::sync::Arc;

use chrono::Utc;

use crate::app::assemble::{assemble, AssemblyContext};
use crate::app::broker::{CandleSink, JobDelivery, JobSource};
use crate::config::{AckMode, ProviderConfig, WorkerConfig};
use crate::error::{AppError, Result};
use crate::fetch::{
    decode_history, CredentialProvider, HistoryFetcher, HistoryRequest, RateLimiter,
    RequestBuilder, TrimPolicy,
};
use crate::records::{decode_job, Job};

/// Drains job messages and publishes one candle message per decoded row.
///
/// Jobs are handled strictly one after another; the rate gate wait blocks
/// the whole loop.
pub struct JobController<S, K, F> {
    source: S,
    sink: K,
    fetcher: F,
    requests: RequestBuilder,
    limiter: RateLimiter,
    provider: ProviderConfig,
    trim: TrimPolicy,
    ack_mode: AckMode,
}

impl<S, K, F> JobController<S, K, F>
where
    S: JobSource,
    K: CandleSink,
    F: HistoryFetcher,
{
    pub fn new(
        source: S,
        sink: K,
        fetcher: F,
        credentials: Arc<dyn CredentialProvider>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            source,
            sink,
            fetcher,
            requests: RequestBuilder::new(config.provider.endpoint.clone(), credentials),
            limiter: RateLimiter::new(config.rate_limit.min_interval()),
            provider: config.provider.clone(),
            trim: config.trim,
            ack_mode: config.ack_mode,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Consume until the source is exhausted. Only a broken source ends the loop early.
    pub async fn run(&mut self) -> Result<()> {
        log::info!("Waiting for jobs (ack mode: {:?})", self.ack_mode);

        while let Some(delivery) = self.source.recv().await {
            let delivery = delivery.map_err(|err| {
                log::error!("Job source failed: {}", err);
                err
            })?;
            self.handle(&delivery).await;
        }

        log::info!("Job source closed; stopping");
        Ok(())
    }

    async fn handle(&mut self, delivery: &JobDelivery) {
        let settled = match self.process(&delivery.payload).await {
            Ok(_) => self.source.ack(delivery).await,
            Err(_) => self.source.reject(delivery).await,
        };

        if let Err(err) = settled {
            log::error!(
                "Failed to settle delivery {}: {}",
                delivery.delivery_tag,
                err
            );
        }
    }

    /// Run one payload through the pipeline and return how many candles were published.
    pub async fn process(&mut self, payload: &[u8]) -> Result<usize> {
        let job = match decode_job(payload) {
            Ok(job) => job,
            Err(err) => {
                log::warn!("Dropping job message: {}", err);
                return Err(err);
            }
        };

        log::info!(
            "Received a job: {} {} {:?}",
            job.symbol,
            job.frequency,
            job.span
        );

        match self.run_job(&job).await {
            Ok(published) => {
                log::info!(
                    "Published {} candles for {} {}",
                    published,
                    job.symbol,
                    job.frequency
                );
                Ok(published)
            }
            Err(err) => {
                log::error!(
                    "Abandoning job for {} {}: {}",
                    job.symbol,
                    job.frequency,
                    err
                );
                Err(err)
            }
        }
    }

    async fn run_job(&mut self, job: &Job) -> Result<usize> {
        let (start, end) = job.resolve_span(Utc::now())?;
        let url = self.requests.build(&HistoryRequest {
            symbol: &job.symbol,
            exchange_suffix: self.provider.suffix_for(job.exchange.as_deref()),
            frequency: job.frequency,
            start,
            end,
        })?;

        self.limiter.gate().await;
        let body = self.fetcher.fetch(&url).await?;
        let rows = decode_history(&body, &self.trim)?;

        let context = AssemblyContext::from(job);
        let mut published = 0;
        for row in &rows {
            let candle = assemble(&context, row)?;
            let payload = candle.to_json()?;
            if let Err(err) = self.sink.publish(&payload).await {
                log::warn!(
                    "Stopped after {} of {} candles for {}",
                    published,
                    rows.len(),
                    job.symbol
                );
                return Err(match err {
                    AppError::Publish(_) => err,
                    other => AppError::publish(other.to_string()),
                });
            }
            published += 1;
        }

        Ok(published)
    }
}
