use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub reasoner: ReasonerConfig,
    pub throttle: ThrottleConfig,
    pub rules: BusinessRules,
    pub store: StoreConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let reasoner = ReasonerConfig {
            endpoint: optional_var("REASONER_ENDPOINT"),
            api_key: optional_var("REASONER_API_KEY"),
            model: env::var("REASONER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            timeout_secs: number_var("REASONER_TIMEOUT_SECS", 60)?,
            max_retries: number_var("REASONER_MAX_RETRIES", 3)?,
        };

        let throttle = ThrottleConfig {
            rate_per_sec: number_var("REASONER_RATE_PER_SEC", 1.0)?,
            burst: number_var("REASONER_BURST", 2)?,
            max_concurrency: number_var("REASONER_MAX_CONCURRENCY", 4)?,
            jitter_ms: number_var("REASONER_JITTER_MS", 250)?,
        };

        let defaults = BusinessRules::default();
        let rules = BusinessRules {
            quiz_pass_score: number_var("RULE_QUIZ_PASS_SCORE", defaults.quiz_pass_score)?,
            onboarding_required_modules: number_var(
                "RULE_ONBOARDING_REQUIRED_MODULES",
                defaults.onboarding_required_modules,
            )?,
            hot_lead_score: number_var("RULE_HOT_LEAD_SCORE", defaults.hot_lead_score)?,
            follow_up_days: number_var("RULE_FOLLOW_UP_DAYS", defaults.follow_up_days)?,
        };

        let store = StoreConfig {
            fetch_limit: number_var("STORE_FETCH_LIMIT", DEFAULT_FETCH_LIMIT)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            reasoner,
            throttle,
            rules,
            store,
        })
    }
}

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_FETCH_LIMIT: usize = 500;

fn optional_var(key: &'static str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn number_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection details for the external reasoning service.
#[derive(Clone)]
pub struct ReasonerConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl ReasonerConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl fmt::Debug for ReasonerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasonerConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Token-bucket and concurrency limits applied to every reasoning call.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    pub rate_per_sec: f64,
    pub burst: u32,
    pub max_concurrency: usize,
    pub jitter_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: 1.0,
            burst: 2,
            max_concurrency: 4,
            jitter_ms: 250,
        }
    }
}

/// Threshold constants that decide when a workflow emits a secondary record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRules {
    /// A quiz passes when its score is at or above this value.
    pub quiz_pass_score: f64,
    pub onboarding_required_modules: usize,
    /// Lead scores at or above this value open a follow-up task.
    pub hot_lead_score: u8,
    pub follow_up_days: i64,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            quiz_pass_score: 70.0,
            onboarding_required_modules: 3,
            hot_lead_score: 80,
            follow_up_days: 3,
        }
    }
}

impl BusinessRules {
    pub fn quiz_passes(&self, score: f64) -> bool {
        score >= self.quiz_pass_score
    }

    pub fn onboarding_complete(&self, completed_modules: usize) -> bool {
        completed_modules >= self.onboarding_required_modules
    }

    pub fn is_hot_lead(&self, score: u8) -> bool {
        score >= self.hot_lead_score
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub fetch_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a valid number"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
