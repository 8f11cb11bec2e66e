use std::sync::Arc;

use crate::app::broker::AmqpBroker;
use crate::app::controller::JobController;
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::fetch::{CredentialProvider, HttpFetcher, StaticCredentials};

/// Entry point used by `main`: connect to the broker and drain jobs until the consumer ends.
pub async fn run(config: WorkerConfig) -> Result<()> {
    let broker = AmqpBroker::connect(&config.broker).await?;
    log::info!(
        "Connected to broker; consuming `{}`, publishing to `{}`",
        config.broker.jobs_queue,
        config.broker.data_queue
    );

    let credentials: Arc<dyn CredentialProvider> = Arc::new(StaticCredentials::new(
        config.provider.crumb.clone(),
        config.provider.cookie.clone(),
    ));
    let fetcher = HttpFetcher::new(config.provider.timeout(), Arc::clone(&credentials))?;

    let source = broker.job_source(config.ack_mode).await?;
    let sink = broker.candle_sink();

    let mut controller = JobController::new(source, sink, fetcher, credentials, &config);
    let outcome = controller.run().await;

    if let Err(err) = broker.close().await {
        log::warn!("Failed to close broker connection cleanly: {}", err);
    }

    outcome
}
