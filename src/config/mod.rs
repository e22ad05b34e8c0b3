//! Application configuration

mod app_config;

pub use app_config::{AppConfig, CacheSettings, LocalTierSettings, ServerConfig, SharedTierSettings};
pub use crate::infrastructure::logging::{LogFormat, LoggingConfig};
