//! PMP Response Cache
//!
//! An HTTP service whose read endpoints are served through a two-tier
//! response cache:
//! - L1: per-process in-memory tier with a short TTL
//! - L2: shared tier (Redis or in-memory), optionally without expiry
//! - Key templates per route, group invalidation on writes
//! - Optional single-flight and cross-instance invalidation broadcast

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use api::state::AppState;
use domain::OperationRegistry;
use infrastructure::cache::{CacheFactory, RedisGroupPublisher, ResponseCacheService};
use infrastructure::team::{InMemoryTeamRepository, TeamService};
use tracing::info;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let settings = &config.cache;
    settings.validate()?;

    let factory = CacheFactory::new();
    let l1 = factory.create_local(&settings.local_tier());
    let l2 = factory
        .create(&settings.shared_tier())
        .await
        .context("Failed to create the shared cache tier")?;

    let mut cache = ResponseCacheService::new(l1, l2).with_single_flight(settings.single_flight);

    if settings.broadcast.enabled {
        let url = settings.l2.redis_url.as_deref().unwrap_or_default();
        let publisher = RedisGroupPublisher::connect(url, settings.broadcast.channel.clone())
            .await
            .context("Failed to connect the invalidation publisher")?;
        cache = cache.with_publisher(Arc::new(publisher));
    }

    let operations = create_operation_registry(config)?;

    info!(
        l2 = %settings.l2.backend,
        operations = operations.len(),
        single_flight = settings.single_flight,
        broadcast = settings.broadcast.enabled,
        "Response cache initialized"
    );

    let team_service = TeamService::new(Arc::new(InMemoryTeamRepository::new()));

    Ok(AppState::new(Arc::new(cache), Arc::new(operations), Arc::new(team_service))
        .with_max_body_bytes(settings.max_body_bytes))
}

/// Built-in route templates plus any configured under `cache.templates`.
/// Templates are immutable, so configuring one for a built-in operation is
/// rejected.
pub fn create_operation_registry(config: &AppConfig) -> anyhow::Result<OperationRegistry> {
    let mut registry = OperationRegistry::new();
    api::v1::register_cache_templates(&mut registry)?;

    for (operation, template) in &config.cache.templates {
        registry
            .register_str(operation, template)
            .with_context(|| format!("Invalid cache template for '{}'", operation))?;
    }

    Ok(registry)
}
