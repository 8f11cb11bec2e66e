use crate::error::{AppError, Result};

use super::{BrokerConfig, ProviderConfig, WorkerConfig};

/// Validate a worker configuration and surface every problem at once.
pub fn validate_config(config: &WorkerConfig) -> Result<()> {
    let mut issues = Vec::new();

    validate_broker(&config.broker, &mut issues);
    validate_provider(&config.provider, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "worker config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_broker(broker: &BrokerConfig, issues: &mut Vec<String>) {
    if broker.uri.trim().is_empty() {
        issues.push("broker.uri must not be empty".to_string());
    }
    if broker.jobs_queue.trim().is_empty() {
        issues.push("broker.jobs_queue must not be empty".to_string());
    }
    if broker.data_queue.trim().is_empty() {
        issues.push("broker.data_queue must not be empty".to_string());
    }
    if broker.jobs_queue == broker.data_queue {
        issues.push(format!(
            "broker.jobs_queue and broker.data_queue must differ (both `{}`)",
            broker.jobs_queue
        ));
    }
}

fn validate_provider(provider: &ProviderConfig, issues: &mut Vec<String>) {
    if provider.endpoint.trim().is_empty() {
        issues.push("provider.endpoint must not be empty".to_string());
    } else if reqwest::Url::parse(&provider.endpoint).is_err() {
        issues.push(format!(
            "provider.endpoint `{}` is not a valid URL",
            provider.endpoint
        ));
    }
    if provider.crumb.trim().is_empty() {
        issues.push("provider.crumb must not be empty".to_string());
    }
    if provider.cookie.name.trim().is_empty() || provider.cookie.value.trim().is_empty() {
        issues.push("provider.cookie needs both a name and a value".to_string());
    }
    if provider.cookie.domain.trim_start_matches('.').is_empty() {
        issues.push("provider.cookie.domain must not be empty".to_string());
    }
    if provider.timeout_secs == 0 {
        issues.push("provider.timeout_secs must be greater than zero".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shared_queue_names() {
        let mut config = WorkerConfig::builtin();
        config.broker.data_queue = config.broker.jobs_queue.clone();

        let err = validate_config(&config).expect_err("validation should fail");
        assert!(
            err.to_string().contains("must differ"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn aggregates_provider_issues() {
        let mut config = WorkerConfig::builtin();
        config.provider.endpoint = "not a url".to_string();
        config.provider.crumb = String::new();
        config.provider.cookie.domain = ".".to_string();

        let message = validate_config(&config)
            .expect_err("validation should fail")
            .to_string();
        assert!(message.contains("not a valid URL"), "{message}");
        assert!(message.contains("crumb"), "{message}");
        assert!(message.contains("cookie.domain"), "{message}");
    }
}
