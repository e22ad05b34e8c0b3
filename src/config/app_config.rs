use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::cache::{BroadcastConfig, CacheConfig, CacheType};
use crate::infrastructure::logging::LoggingConfig;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Response cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub l1: LocalTierSettings,
    #[serde(default)]
    pub l2: SharedTierSettings,
    /// Coalesce concurrent misses on the same key
    #[serde(default)]
    pub single_flight: bool,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    /// Largest response body the HTTP layer will buffer for caching
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Extra templates keyed by operation, e.g. `"GET /v1/teams" = "teams:list"`
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalTierSettings {
    #[serde(default = "default_l1_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SharedTierSettings {
    #[serde(default)]
    pub backend: CacheType,
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// Zero keeps entries until they are invalidated
    #[serde(default)]
    pub ttl_secs: u64,
}

fn default_l1_ttl_secs() -> u64 {
    60
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            l1: LocalTierSettings::default(),
            l2: SharedTierSettings::default(),
            single_flight: false,
            broadcast: BroadcastConfig::default(),
            max_body_bytes: default_max_body_bytes(),
            templates: BTreeMap::new(),
        }
    }
}

impl Default for LocalTierSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_l1_ttl_secs(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl CacheSettings {
    pub fn local_tier(&self) -> CacheConfig {
        CacheConfig::in_memory()
            .with_default_ttl(Some(Duration::from_secs(self.l1.ttl_secs)))
            .with_max_capacity(self.l1.max_capacity)
    }

    pub fn shared_tier(&self) -> CacheConfig {
        let mut config = CacheConfig {
            cache_type: self.l2.backend,
            redis_url: self.l2.redis_url.clone(),
            ..CacheConfig::default()
        }
        .with_default_ttl(Some(Duration::from_secs(self.l2.ttl_secs)))
        .with_max_capacity(self.l1.max_capacity);

        if let Some(prefix) = &self.l2.key_prefix {
            config = config.with_key_prefix(prefix.clone());
        }

        config
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.l1.ttl_secs == 0 {
            return Err(DomainError::configuration(
                "cache.l1.ttl_secs must be greater than zero",
            ));
        }

        if self.l1.max_capacity == 0 {
            return Err(DomainError::configuration(
                "cache.l1.max_capacity must be greater than zero",
            ));
        }

        if self.l2.backend == CacheType::Redis && self.l2.redis_url.is_none() {
            return Err(DomainError::configuration(
                "cache.l2.redis_url is required when the shared tier is redis",
            ));
        }

        if self.broadcast.enabled && self.l2.backend != CacheType::Redis {
            return Err(DomainError::configuration(
                "cache.broadcast requires the redis shared tier",
            ));
        }

        Ok(())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
