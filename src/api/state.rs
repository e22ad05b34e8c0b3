//! Application state shared by handlers and middleware

use std::sync::Arc;

use crate::domain::OperationRegistry;
use crate::infrastructure::cache::ResponseCacheService;
use crate::infrastructure::team::TeamService;

/// Largest response body buffered for caching unless configured otherwise
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppState {
    pub cache: Arc<ResponseCacheService>,
    pub operations: Arc<OperationRegistry>,
    pub team_service: Arc<TeamService>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        cache: Arc<ResponseCacheService>,
        operations: Arc<OperationRegistry>,
        team_service: Arc<TeamService>,
    ) -> Self {
        Self {
            cache,
            operations,
            team_service,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}
