mod settings;

pub use settings::{LogConfig, OtelConfig, QueueConfig, RedisConfig, ServerConfig, Settings};
