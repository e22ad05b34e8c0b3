//! Cache infrastructure - tiers, group tracking and the response cache service

mod broadcast;
mod factory;
mod group_index;
mod in_memory;
mod invalidator;
mod redis;
mod service;
mod single_flight;

pub use broadcast::{BroadcastConfig, GroupPublisher, InvalidationListener, RedisGroupPublisher};
pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use group_index::GroupIndex;
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use invalidator::Invalidator;
pub use redis::{RedisCache, RedisCacheConfig};
pub use service::ResponseCacheService;
pub use single_flight::{FlightGuard, SingleFlight};

#[cfg(test)]
pub use broadcast::mock::RecordingPublisher;
