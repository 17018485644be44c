//! Server configuration

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Timing and retry settings for the analysis call
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Timeout applied to each attempt
    pub attempt_timeout: Duration,
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before attempt n is `(n - 1) * backoff_step`
    pub backoff_step: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(50),
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

/// Result poller settings
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    /// How long one result request waits on a pending run before offering cancel-or-wait
    pub ceiling: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            ceiling: Duration::from_secs(60),
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Persistence is disabled when unset; every run is then anonymous.
    pub database_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// How long settled runs stay readable before being pruned
    pub run_retention: Duration,
    pub analysis: AnalysisSettings,
    pub poll: PollSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            database_url: None,
            anthropic_api_key: None,
            anthropic_model: None,
            cors_origins: vec!["*".into()],
            rate_limit_rps: 10,
            run_retention: Duration::from_secs(60 * 60),
            analysis: AnalysisSettings::default(),
            poll: PollSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let analysis = AnalysisSettings {
            attempt_timeout: Duration::from_secs(parse_var(
                "ANALYSIS_TIMEOUT_SECS",
                defaults.analysis.attempt_timeout.as_secs(),
            )),
            max_attempts: parse_var("ANALYSIS_MAX_ATTEMPTS", defaults.analysis.max_attempts).max(1),
            backoff_step: Duration::from_secs(parse_var(
                "ANALYSIS_BACKOFF_SECS",
                defaults.analysis.backoff_step.as_secs(),
            )),
        };
        let poll = PollSettings {
            interval: Duration::from_millis(
                parse_var("POLL_INTERVAL_MS", defaults.poll.interval.as_millis() as u64).max(1),
            ),
            ceiling: Duration::from_secs(parse_var(
                "POLL_CEILING_SECS",
                defaults.poll.ceiling.as_secs(),
            )),
        };

        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database_url: optional_var("DATABASE_URL"),
            anthropic_api_key: optional_var("ANTHROPIC_API_KEY"),
            anthropic_model: optional_var("ANTHROPIC_MODEL"),
            cors_origins: optional_var("CORS_ORIGINS")
                .map(|v| split_origins(&v))
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: parse_var("RATE_LIMIT_RPS", defaults.rate_limit_rps).max(1),
            run_retention: Duration::from_secs(parse_var(
                "RUN_RETENTION_SECS",
                defaults.run_retention.as_secs(),
            )),
            analysis,
            poll,
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, falling back to the default on absence or bad input
fn parse_var<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match optional_var(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Invalid {key} value {raw:?} ({e}), using default: {default}");
            default
        }),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
