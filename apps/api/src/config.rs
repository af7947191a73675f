// Application configuration
//
// Read once at startup from the environment (after `.env` is loaded).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::agents::errors::{AgentError, AgentResult};
use crate::agents::orchestrator::OrchestratorSettings;
use crate::agents::pool::{DEFAULT_CAPACITY, DEFAULT_WORKERS};
use crate::agents::retry::RetryPolicy;
use crate::agents::reviewer::DEFAULT_PASS_PROBABILITY;
use crate::domain::agent::ProviderType;
use crate::infrastructure::providers::HttpGatewayConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub output_dir: PathBuf,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub default_provider: ProviderType,
    pub worker_pool_size: usize,
    pub job_queue_capacity: usize,
    pub provider_max_attempts: u32,
    pub provider_initial_backoff: Duration,
    pub review_pass_probability: f64,
    pub rng_seed: Option<u64>,
    pub reviewer_joins_producer: bool,
}

impl AppConfig {
    /// Loads the configuration from process environment variables
    pub fn from_env() -> AgentResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let worker_pool_size = parse_or(&get, "WORKER_POOL_SIZE", DEFAULT_WORKERS)?;
        if worker_pool_size == 0 {
            return Err(invalid("WORKER_POOL_SIZE", "must be at least 1"));
        }
        let job_queue_capacity = parse_or(&get, "JOB_QUEUE_CAPACITY", DEFAULT_CAPACITY)?;
        if job_queue_capacity == 0 {
            return Err(invalid("JOB_QUEUE_CAPACITY", "must be at least 1"));
        }
        let provider_max_attempts = parse_or(&get, "PROVIDER_MAX_ATTEMPTS", 3u32)?;
        if provider_max_attempts == 0 {
            return Err(invalid("PROVIDER_MAX_ATTEMPTS", "must be at least 1"));
        }
        let review_pass_probability =
            parse_or(&get, "REVIEW_PASS_PROBABILITY", DEFAULT_PASS_PROBABILITY)?;
        if !(0.0..=1.0).contains(&review_pass_probability) {
            return Err(invalid("REVIEW_PASS_PROBABILITY", "must be between 0 and 1"));
        }

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 5000)))?,
            database_url: get("DATABASE_URL"),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            default_provider: parse_or(&get, "DEFAULT_PROVIDER", ProviderType::Anthropic)?,
            worker_pool_size,
            job_queue_capacity,
            provider_max_attempts,
            provider_initial_backoff: Duration::from_millis(parse_or(
                &get,
                "PROVIDER_INITIAL_BACKOFF_MS",
                1_000u64,
            )?),
            review_pass_probability,
            rng_seed: get("RNG_SEED")
                .map(|v| parse_value("RNG_SEED", &v))
                .transpose()?,
            reviewer_joins_producer: parse_bool(&get, "REVIEWER_JOINS_PRODUCER", true)?,
        })
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            default_provider: self.default_provider,
            reviewer_joins_producer: self.reviewer_joins_producer,
            retry: RetryPolicy::new(self.provider_max_attempts, self.provider_initial_backoff),
            pass_probability: self.review_pass_probability,
            workers: self.worker_pool_size,
            queue_capacity: self.job_queue_capacity,
            rng_seed: self.rng_seed,
            ..OrchestratorSettings::default()
        }
    }

    pub fn gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            anthropic_api_key: self.anthropic_api_key.clone(),
            openai_api_key: self.openai_api_key.clone(),
            google_api_key: self.google_api_key.clone(),
            ..HttpGatewayConfig::default()
        }
    }
}

fn invalid(key: &str, reason: impl std::fmt::Display) -> AgentError {
    AgentError::ConfigError(format!("{}: {}", key, reason))
}

fn parse_value<T>(key: &str, raw: &str) -> AgentResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| invalid(key, format!("invalid value '{}' ({})", raw, e)))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AgentResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> AgentResult<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, format!("invalid boolean '{}'", v))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> AgentResult<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:5000");
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.default_provider, ProviderType::Anthropic);
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.job_queue_capacity, 64);
        assert_eq!(config.provider_max_attempts, 3);
        assert_eq!(config.provider_initial_backoff, Duration::from_millis(1000));
        assert_eq!(config.review_pass_probability, 0.66);
        assert_eq!(config.rng_seed, None);
        assert!(config.reviewer_joins_producer);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn values_are_parsed() {
        let config = load(&[
            ("DEFAULT_PROVIDER", "google"),
            ("WORKER_POOL_SIZE", "2"),
            ("RNG_SEED", "99"),
            ("REVIEWER_JOINS_PRODUCER", "false"),
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "   "),
        ])
        .unwrap();

        assert_eq!(config.default_provider, ProviderType::Gemini);
        assert_eq!(config.worker_pool_size, 2);
        assert_eq!(config.rng_seed, Some(99));
        assert!(!config.reviewer_joins_producer);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert!(config.database_url.is_none());

        let settings = config.orchestrator_settings();
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.rng_seed, Some(99));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for pairs in [
            [("WORKER_POOL_SIZE", "many")],
            [("WORKER_POOL_SIZE", "0")],
            [("REVIEW_PASS_PROBABILITY", "1.5")],
            [("DEFAULT_PROVIDER", "mistral")],
            [("REVIEWER_JOINS_PRODUCER", "maybe")],
            [("BIND_ADDR", "localhost")],
        ] {
            let err = load(&pairs).unwrap_err();
            assert!(matches!(err, AgentError::ConfigError(_)), "{:?}", pairs);
        }
    }
}
