//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// GET /ready
///
/// An unreachable shared tier only degrades the service: reads fall back to
/// the local tier and the handlers, so requests are still accepted.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let shared = check_shared_tier(&state).await;

    let status = match shared.status {
        HealthStatus::Healthy => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![shared]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    (StatusCode::OK, Json(response))
}

/// GET /live
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn check_shared_tier(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    let (status, message) = match state.cache.ping_shared().await {
        Ok(()) => (HealthStatus::Healthy, None),
        Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
    };

    HealthCheck {
        name: "l2_cache".to_string(),
        status,
        message,
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::cache::MockCache;
    use crate::domain::{Cache, OperationRegistry};
    use crate::infrastructure::cache::{InMemoryCache, ResponseCacheService};
    use crate::infrastructure::team::{InMemoryTeamRepository, TeamService};

    fn state_with_l2(l2: Arc<dyn Cache>) -> AppState {
        let l1: Arc<dyn Cache> = Arc::new(InMemoryCache::new());

        AppState::new(
            Arc::new(ResponseCacheService::new(l1, l2)),
            Arc::new(OperationRegistry::new()),
            Arc::new(TeamService::new(Arc::new(InMemoryTeamRepository::new()))),
        )
    }

    #[tokio::test]
    async fn test_shared_tier_healthy() {
        let state = state_with_l2(Arc::new(InMemoryCache::new()));
        let check = check_shared_tier(&state).await;

        assert_eq!(check.status, HealthStatus::Healthy);
        assert!(check.message.is_none());
    }

    #[tokio::test]
    async fn test_shared_tier_outage_is_reported() {
        let state = state_with_l2(Arc::new(MockCache::new().with_error("connection refused")));
        let check = check_shared_tier(&state).await;

        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert!(check.message.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_ready_stays_ok_when_degraded() {
        let state = state_with_l2(Arc::new(MockCache::new().with_error("down")));
        let response = ready_check(State(state)).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
