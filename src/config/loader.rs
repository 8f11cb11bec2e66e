use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, Context, Result};

use super::{validator, AckMode, WorkerConfig};

/// Load a worker configuration from a JSON file layered over the builtin defaults.
pub fn load(path: &Path) -> Result<WorkerConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read worker config JSON at {}", path.display()))?;

    let raw: RawWorkerConfig = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse worker config JSON at {}", path.display()))?;

    let config = raw.into_config()?;
    validator::validate_config(&config)?;

    Ok(config)
}

/// Expand `${NAME}` placeholders from the process environment.
pub fn expand_env_vars(value: &str) -> Result<String> {
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(open) = rest.find("${") {
        expanded.push_str(&rest[..open]);
        let tail = &rest[open + 2..];
        let close = tail
            .find('}')
            .ok_or_else(|| AppError::message("config value has an unclosed `${` placeholder"))?;

        let name = &tail[..close];
        if name.is_empty() {
            return Err(AppError::message("config value has an empty `${}` placeholder"));
        }
        let resolved = std::env::var(name)
            .with_context(|| format!("config references unset environment variable {name}"))?;
        expanded.push_str(&resolved);

        rest = &tail[close + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn expand_opt(value: Option<String>, fallback: String) -> Result<String> {
    match value {
        Some(raw) => expand_env_vars(&raw),
        None => Ok(fallback),
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawWorkerConfig {
    #[serde(default)]
    broker: RawBrokerConfig,
    #[serde(default)]
    provider: RawProviderConfig,
    #[serde(default)]
    rate_limit: RawRateLimitConfig,
    #[serde(default)]
    decode: RawDecodeConfig,
    #[serde(default)]
    ack_mode: Option<AckMode>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBrokerConfig {
    uri: Option<String>,
    jobs_queue: Option<String>,
    data_queue: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawProviderConfig {
    endpoint: Option<String>,
    crumb: Option<String>,
    #[serde(default)]
    cookie: RawCookieConfig,
    timeout_secs: Option<u64>,
    exchange_suffixes: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize, Default)]
struct RawCookieConfig {
    name: Option<String>,
    value: Option<String>,
    domain: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawRateLimitConfig {
    min_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawDecodeConfig {
    trailing_rows: Option<usize>,
}

impl RawWorkerConfig {
    fn into_config(self) -> Result<WorkerConfig> {
        let defaults = WorkerConfig::builtin();
        let mut config = defaults.clone();

        config.broker.uri = expand_opt(self.broker.uri, defaults.broker.uri)?;
        config.broker.jobs_queue = expand_opt(self.broker.jobs_queue, defaults.broker.jobs_queue)?;
        config.broker.data_queue = expand_opt(self.broker.data_queue, defaults.broker.data_queue)?;

        let provider = self.provider;
        config.provider.endpoint = expand_opt(provider.endpoint, defaults.provider.endpoint)?;
        config.provider.crumb = expand_opt(provider.crumb, defaults.provider.crumb)?;
        config.provider.cookie.name =
            expand_opt(provider.cookie.name, defaults.provider.cookie.name)?;
        config.provider.cookie.value =
            expand_opt(provider.cookie.value, defaults.provider.cookie.value)?;
        config.provider.cookie.domain =
            expand_opt(provider.cookie.domain, defaults.provider.cookie.domain)?;
        if let Some(timeout) = provider.timeout_secs {
            config.provider.timeout_secs = timeout;
        }
        if let Some(suffixes) = provider.exchange_suffixes {
            config.provider.exchange_suffixes = suffixes;
        }

        if let Some(interval) = self.rate_limit.min_interval_ms {
            config.rate_limit.min_interval_ms = interval;
        }
        if let Some(trailing_rows) = self.decode.trailing_rows {
            config.trim.trailing_rows = trailing_rows;
        }
        if let Some(ack_mode) = self.ack_mode {
            config.ack_mode = ack_mode;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, json: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "candle-worker-{}-{}.json",
            name,
            std::process::id()
        ));
        fs::write(&path, json).expect("write temp config");
        path
    }

    #[test]
    fn overrides_only_given_fields() {
        let path = write_config(
            "overrides",
            r#"{
                "broker": {"jobs_queue": "candle-jobs"},
                "decode": {"trailing_rows": 0},
                "ack_mode": "after_publish",
                "rate_limit": {"min_interval_ms": 250}
            }"#,
        );

        let config = load(&path).expect("config loads");
        fs::remove_file(&path).ok();

        assert_eq!(config.broker.jobs_queue, "candle-jobs");
        assert_eq!(config.broker.data_queue, "data");
        assert_eq!(config.trim.trailing_rows, 0);
        assert_eq!(config.ack_mode, AckMode::AfterPublish);
        assert_eq!(config.rate_limit.min_interval_ms, 250);
        assert_eq!(config.provider.crumb, super::super::DEFAULT_CRUMB);
    }

    #[test]
    fn expands_environment_placeholders() {
        std::env::set_var("CANDLE_WORKER_TEST_CRUMB", "fresh-crumb");
        let expanded = expand_env_vars("pre-${CANDLE_WORKER_TEST_CRUMB}").unwrap();
        assert_eq!(expanded, "pre-fresh-crumb");
        assert_eq!(
            expand_env_vars("${CANDLE_WORKER_TEST_CRUMB}/${CANDLE_WORKER_TEST_CRUMB}").unwrap(),
            "fresh-crumb/fresh-crumb"
        );
        assert_eq!(expand_env_vars("plain $value {x}").unwrap(), "plain $value {x}");

        assert!(expand_env_vars("${CANDLE_WORKER_SURELY_UNSET_VAR}").is_err());
        assert!(expand_env_vars("${unterminated").is_err());
        assert!(expand_env_vars("${}").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let path = std::env::temp_dir().join("candle-worker-does-not-exist.json");

        let err = load(&path).expect_err("missing file must fail");

        assert!(matches!(err, AppError::Other(_)), "unexpected error: {err:?}");
        assert!(
            format!("{err:#}").contains("candle-worker-does-not-exist.json"),
            "unexpected error message: {err}"
        );
    }

    #[test]
    fn rejects_invalid_overrides() {
        let path = write_config(
            "invalid",
            r#"{"broker": {"jobs_queue": "data"}, "provider": {"timeout_secs": 0}}"#,
        );

        let err = load(&path).expect_err("validation should fail");
        fs::remove_file(&path).ok();

        let message = err.to_string();
        assert!(message.contains("must differ"), "unexpected error message: {message}");
        assert!(message.contains("timeout"), "unexpected error message: {message}");
    }
}
