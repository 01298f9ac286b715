use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Directory with a built UI to serve for non-API routes
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_cb_failure_threshold")]
    pub circuit_breaker_failure_threshold: u32,
    #[serde(default = "default_cb_success_threshold")]
    pub circuit_breaker_success_threshold: u32,
    #[serde(default = "default_cb_reset_timeout")]
    pub circuit_breaker_reset_timeout_seconds: u64,
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_delay_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_delay_ms: u64,
    /// Connection attempts made at startup before serving anyway
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Upper bound on establishing a connection
    #[serde(default = "default_redis_timeout")]
    pub connection_timeout_ms: u64,
    /// Upper bound on waiting for a command reply
    #[serde(default = "default_redis_timeout")]
    pub response_timeout_ms: u64,
}

/// Queue broker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Storage backend: "memory" or "redis"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Prefix for storage keys (`{prefix}:{queue_name}`)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Interval between storage checks while long polling
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Long-poll timeout used when the request does not pass one
    #[serde(default = "default_timeout")]
    pub default_timeout_ms: u64,
    /// Upper bound for caller-supplied timeouts
    #[serde(default = "default_max_timeout")]
    pub max_timeout_ms: u64,
    /// Consecutive storage failures tolerated inside one long poll
    #[serde(default = "default_max_poll_errors")]
    pub max_poll_errors: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_cb_failure_threshold() -> u32 {
    5
}

fn default_cb_success_threshold() -> u32 {
    2
}

fn default_cb_reset_timeout() -> u64 {
    30
}

fn default_backoff_initial() -> u64 {
    100
}

fn default_backoff_max() -> u64 {
    30_000
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_redis_timeout() -> u64 {
    2_000
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_key_prefix() -> String {
    "queue".to_string()
}

fn default_poll_interval() -> u64 {
    100
}

fn default_timeout() -> u64 {
    10_000
}

fn default_max_timeout() -> u64 {
    60_000
}

fn default_max_poll_errors() -> u32 {
    3
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "ara-message-queue".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("queue.backend", default_backend())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // MQ_SERVER__PORT, MQ_QUEUE__BACKEND, MQ_REDIS__URL, ...
            .add_source(
                Environment::with_prefix("MQ")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            redis: RedisConfig::default(),
            queue: QueueConfig::default(),
            log: LogConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl RedisConfig {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve the effective long-poll timeout for a request.
    ///
    /// Missing values fall back to `default_timeout_ms`; anything above
    /// `max_timeout_ms` is clamped.
    pub fn effective_timeout(&self, requested_ms: Option<u64>) -> Duration {
        let ms = requested_ms.unwrap_or(self.default_timeout_ms);
        Duration::from_millis(ms.min(self.max_timeout_ms))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            body_limit_bytes: default_body_limit(),
            static_dir: None,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            circuit_breaker_failure_threshold: default_cb_failure_threshold(),
            circuit_breaker_success_threshold: default_cb_success_threshold(),
            circuit_breaker_reset_timeout_seconds: default_cb_reset_timeout(),
            backoff_initial_delay_ms: default_backoff_initial(),
            backoff_max_delay_ms: default_backoff_max(),
            connect_attempts: default_connect_attempts(),
            connection_timeout_ms: default_redis_timeout(),
            response_timeout_ms: default_redis_timeout(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            key_prefix: default_key_prefix(),
            poll_interval_ms: default_poll_interval(),
            default_timeout_ms: default_timeout(),
            max_timeout_ms: default_max_timeout(),
            max_poll_errors: default_max_poll_errors(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
