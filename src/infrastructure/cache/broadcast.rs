//! Cross-instance group invalidation over Redis pub/sub
//!
//! An instance that invalidates a group publishes the group name; every
//! instance (including the publisher) runs a listener that drops the keys it
//! tracks for that group. Without this, other instances keep serving their
//! local copies until the local TTL elapses.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::invalidator::Invalidator;
use crate::domain::DomainError;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Broadcast settings
#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "cache:invalidate-group".to_string()
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel: default_channel(),
        }
    }
}

/// Sends invalidated group names to other instances
#[async_trait]
pub trait GroupPublisher: Send + Sync + fmt::Debug {
    async fn publish(&self, group: &str) -> Result<(), DomainError>;
}

/// Publishes on a Redis channel
#[derive(Clone)]
pub struct RedisGroupPublisher {
    connection: ConnectionManager,
    channel: String,
}

impl fmt::Debug for RedisGroupPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisGroupPublisher")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl RedisGroupPublisher {
    pub async fn connect(redis_url: &str, channel: impl Into<String>) -> Result<Self, DomainError> {
        let client = Client::open(redis_url)
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl GroupPublisher for RedisGroupPublisher {
    async fn publish(&self, group: &str) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let receivers: i64 = conn.publish(&self.channel, group).await.map_err(|e| {
            DomainError::cache(format!("Failed to publish invalidation of '{}': {}", group, e))
        })?;

        debug!(group = %group, receivers, "Published group invalidation");
        Ok(())
    }
}

/// Subscribes to the invalidation channel and applies each message locally
pub struct InvalidationListener {
    redis_url: String,
    channel: String,
    invalidator: Arc<Invalidator>,
}

impl InvalidationListener {
    pub fn new(
        redis_url: impl Into<String>,
        channel: impl Into<String>,
        invalidator: Arc<Invalidator>,
    ) -> Self {
        Self {
            redis_url: redis_url.into(),
            channel: channel.into(),
            invalidator,
        }
    }

    /// Spawns the listener; it reconnects with exponential backoff until
    /// aborted. A session that got as far as subscribing restarts the backoff.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;

            loop {
                let mut subscribed = false;
                let e = self.run(&mut subscribed).await;
                let delay = retry_delay(subscribed, backoff);

                error!(
                    error = %e,
                    backoff_secs = delay.as_secs(),
                    "Invalidation listener failed, reconnecting"
                );
                tokio::time::sleep(delay).await;
                backoff = next_backoff(delay);
            }
        })
    }

    /// Listens until the connection drops; sets `subscribed` once the
    /// subscription is confirmed
    async fn run(&self, subscribed: &mut bool) -> DomainError {
        let client = match Client::open(self.redis_url.as_str()) {
            Ok(client) => client,
            Err(e) => return DomainError::cache(format!("Failed to create Redis client: {}", e)),
        };

        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                return DomainError::cache(format!("Failed to open pub/sub connection: {}", e))
            }
        };

        if let Err(e) = pubsub.subscribe(&self.channel).await {
            return DomainError::cache(format!("Failed to subscribe: {}", e));
        }

        *subscribed = true;
        info!(channel = %self.channel, "Subscribed to group invalidations");

        let mut messages = pubsub.on_message();

        while let Some(message) = messages.next().await {
            match message.get_payload::<String>() {
                Ok(group) => {
                    let removed = self.invalidator.invalidate_local(&group).await;
                    debug!(group = %group, removed, "Applied remote group invalidation");
                }
                Err(e) => warn!(error = %e, "Ignoring malformed invalidation message"),
            }
        }

        DomainError::cache("Pub/sub connection closed")
    }
}

/// Delay before reconnecting: the initial one after a session that
/// subscribed, otherwise the current backoff
fn retry_delay(subscribed: bool, backoff: Duration) -> Duration {
    if subscribed {
        INITIAL_BACKOFF
    } else {
        backoff
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records published groups, optionally failing
    #[derive(Debug, Default)]
    pub struct RecordingPublisher {
        published: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingPublisher {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn published(&self) -> Vec<String> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GroupPublisher for RecordingPublisher {
        async fn publish(&self, group: &str) -> Result<(), DomainError> {
            if self.fail {
                return Err(DomainError::cache("publish refused"));
            }

            self.published.lock().unwrap().push(group.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(next_backoff(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_backoff(Duration::from_secs(200)), MAX_BACKOFF);
    }

    #[test]
    fn test_subscribed_session_restarts_backoff() {
        let mut backoff = INITIAL_BACKOFF;
        for _ in 0..10 {
            backoff = next_backoff(retry_delay(false, backoff));
        }
        assert_eq!(backoff, MAX_BACKOFF);

        let delay = retry_delay(true, backoff);
        assert_eq!(delay, INITIAL_BACKOFF);
        assert_eq!(next_backoff(delay), Duration::from_secs(2));
    }

    #[test]
    fn test_failed_connects_keep_growing_backoff() {
        assert_eq!(retry_delay(false, Duration::from_secs(8)), Duration::from_secs(8));
    }

    #[test]
    fn test_broadcast_config_defaults() {
        let config: BroadcastConfig = serde_json::from_str("{}").unwrap();

        assert!(!config.enabled);
        assert_eq!(config.channel, "cache:invalidate-group");
    }
}
