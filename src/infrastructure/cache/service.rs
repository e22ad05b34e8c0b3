//! Two-tier response cache: lookup, populate and invalidate
//!
//! Reads go L1, then L2 (promoting hits into L1), then the handler, whose
//! result is stored in both tiers. Writes invalidate their group before the
//! handler runs. Shared-tier failures degrade to misses and are never
//! surfaced to callers.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::broadcast::GroupPublisher;
use super::group_index::GroupIndex;
use super::invalidator::Invalidator;
use super::single_flight::{FlightGuard, SingleFlight};
use crate::domain::cache::{
    canonical_json, Cache, KeyResolver, KeyTemplate, Provenance, RequestContext, ResolvedKey,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{
    record_cache_lookup, record_l2_error, record_populate_skipped,
};

/// Cache service shared by every request pipeline in the process
#[derive(Debug)]
pub struct ResponseCacheService {
    resolver: KeyResolver,
    l1: Arc<dyn Cache>,
    l2: Arc<dyn Cache>,
    index: Arc<GroupIndex>,
    invalidator: Arc<Invalidator>,
    flights: Option<SingleFlight>,
}

impl ResponseCacheService {
    pub fn new(l1: Arc<dyn Cache>, l2: Arc<dyn Cache>) -> Self {
        let index = Arc::new(GroupIndex::new());
        let invalidator = Arc::new(Invalidator::new(l1.clone(), l2.clone(), index.clone()));

        Self {
            resolver: KeyResolver::new(),
            l1,
            l2,
            index,
            invalidator,
            flights: None,
        }
    }

    /// Coalesce concurrent misses on the same key
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(SingleFlight::new);
        self
    }

    /// Broadcast every invalidated group through `publisher`
    pub fn with_publisher(mut self, publisher: Arc<dyn GroupPublisher>) -> Self {
        self.invalidator = Arc::new(
            Invalidator::new(self.l1.clone(), self.l2.clone(), self.index.clone())
                .with_publisher(publisher),
        );
        self
    }

    pub fn invalidator(&self) -> Arc<Invalidator> {
        Arc::clone(&self.invalidator)
    }

    pub fn group_index(&self) -> &GroupIndex {
        &self.index
    }

    pub fn resolve(&self, template: &KeyTemplate, ctx: &RequestContext) -> Option<ResolvedKey> {
        self.resolver.resolve(template, ctx)
    }

    /// Checks L1, then L2. An L2 hit is copied into L1 before returning.
    pub async fn lookup(&self, resolved: &ResolvedKey) -> Option<(Value, Provenance)> {
        let key = resolved.as_str();

        match self.l1.get_raw(key).await {
            Ok(Some(text)) => {
                if let Some(value) = parse_stored(key, &text) {
                    debug!(key = %key, "Local cache hit");
                    return Some((value, Provenance::L1Hit));
                }
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Local cache read failed"),
        }

        match self.l2.get_raw(key).await {
            Ok(Some(text)) => {
                let value = parse_stored(key, &text)?;
                debug!(key = %key, "Shared cache hit, promoting to local tier");

                match self.l1.set_raw(key, &text, None).await {
                    Ok(()) => self.index.track(&resolved.group, key),
                    Err(e) => warn!(key = %key, error = %e, "Failed to promote into local tier"),
                }

                Some((value, Provenance::L2Hit))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Shared cache read failed, treating as miss");
                record_l2_error("get");
                None
            }
        }
    }

    /// Stores the canonical JSON text of `value` in both tiers and tracks the
    /// key under its group. Tier failures are logged and skipped.
    pub async fn populate(&self, resolved: &ResolvedKey, value: &Value) {
        let key = resolved.as_str();
        let text = canonical_json(value);
        let mut stored = false;

        match self.l1.set_raw(key, &text, None).await {
            Ok(()) => stored = true,
            Err(e) => warn!(key = %key, error = %e, "Failed to write local tier"),
        }

        match self.l2.set_raw(key, &text, None).await {
            Ok(()) => stored = true,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write shared tier");
                record_l2_error("set");
            }
        }

        if stored {
            self.index.track(&resolved.group, key);
            debug!(key = %key, group = %resolved.group, "Populated cache");
        }
    }

    /// Invalidates a group in both tiers; returns the number of keys dropped
    pub async fn invalidate(&self, group: &str) -> usize {
        self.invalidator.invalidate(group).await
    }

    /// Exclusive access to compute `key`, when single-flight is enabled
    pub async fn begin_flight(&self, key: &str) -> Option<FlightGuard<'_>> {
        match &self.flights {
            Some(flights) => Some(flights.acquire(key).await),
            None => None,
        }
    }

    /// Reachability of the shared tier
    pub async fn ping_shared(&self) -> Result<(), DomainError> {
        self.l2.ping().await
    }

    /// Runs `handler` behind the cache.
    ///
    /// Without a template (or when it cannot be resolved) the handler runs
    /// uncached and no provenance is reported. Writes invalidate the group
    /// first. Reads return a cached value when present; otherwise the handler
    /// result is stored as canonical JSON and returned to the caller as the
    /// handler produced it. Handler errors are returned unchanged and never
    /// cached.
    pub async fn cached<T, E, F, Fut>(
        &self,
        template: Option<&KeyTemplate>,
        ctx: &RequestContext,
        handler: F,
    ) -> Result<(T, Option<Provenance>), E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(resolved) = template.and_then(|t| self.resolve(t, ctx)) else {
            return handler().await.map(|value| (value, None));
        };

        if ctx.is_write() {
            self.invalidate(&resolved.group).await;
            return handler().await.map(|value| (value, None));
        }

        if !ctx.is_read() {
            return handler().await.map(|value| (value, None));
        }

        if let Some(hit) = self.typed_hit::<T>(&resolved).await {
            return Ok(hit);
        }

        let flight = self.begin_flight(&resolved.key).await;

        if flight.is_some() {
            if let Some(hit) = self.typed_hit::<T>(&resolved).await {
                return Ok(hit);
            }
        }

        let value = handler().await?;
        record_cache_lookup(Provenance::Miss);
        debug!(key = %resolved.key, "Cache miss, computed value");

        match canonicalize(&value) {
            Some(json) => self.populate(&resolved, &json).await,
            None => record_populate_skipped("not_serializable"),
        }

        drop(flight);
        Ok((value, Some(Provenance::Miss)))
    }

    async fn typed_hit<T: DeserializeOwned>(
        &self,
        resolved: &ResolvedKey,
    ) -> Option<(T, Option<Provenance>)> {
        let (value, provenance) = self.lookup(resolved).await?;

        match serde_json::from_value(value) {
            Ok(typed) => {
                record_cache_lookup(provenance);
                Some((typed, Some(provenance)))
            }
            Err(e) => {
                warn!(key = %resolved.key, error = %e, "Cached value does not match the expected type");
                None
            }
        }
    }
}

fn parse_stored(key: &str, text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unparseable cache entry");
            None
        }
    }
}

/// JSON form of `value` to store, or `None` when the stored text could not
/// be read back as `T` on a later hit.
fn canonicalize<T>(value: &T) -> Option<Value>
where
    T: Serialize + DeserializeOwned,
{
    let json = match serde_json::to_value(value) {
        Ok(json) => json,
        Err(e) => {
            debug!(error = %e, "Value is not representable as JSON, skipping cache");
            return None;
        }
    };

    match serde_json::from_str::<T>(&canonical_json(&json)) {
        Ok(_) => Some(json),
        Err(e) => {
            debug!(error = %e, "Value does not survive a JSON round trip, skipping cache");
            None
        }
    }
}
