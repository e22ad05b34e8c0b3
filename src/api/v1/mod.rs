//! v1 API endpoints

pub mod teams;

use axum::{
    http::Method,
    routing::get,
    Router,
};

use super::state::AppState;
use crate::domain::{DomainError, OperationRegistry};

pub const TEAMS_ROUTE: &str = "/v1/teams";
pub const TEAM_ROUTE: &str = "/v1/teams/{id}";

/// Routes are registered with their full paths so the cache layer sees the
/// complete route pattern.
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route(TEAMS_ROUTE, get(teams::list_teams).post(teams::create_team))
        .route(
            TEAM_ROUTE,
            get(teams::get_team)
                .put(teams::update_team)
                .delete(teams::delete_team),
        )
}

/// Cache key templates for the v1 routes. Every team operation shares the
/// `teams` group, so any write drops every cached team read.
pub fn register_cache_templates(registry: &mut OperationRegistry) -> Result<(), DomainError> {
    registry.register(Method::GET, TEAMS_ROUTE, "teams:list")?;
    registry.register(Method::GET, TEAM_ROUTE, "teams:$params.id")?;
    registry.register(Method::POST, TEAMS_ROUTE, "teams:create")?;
    registry.register(Method::PUT, TEAM_ROUTE, "teams:$params.id")?;
    registry.register(Method::DELETE, TEAM_ROUTE, "teams:$params.id")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_cache_templates() {
        let mut registry = OperationRegistry::new();
        register_cache_templates(&mut registry).unwrap();

        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry
                .template_for(&Method::GET, TEAM_ROUTE)
                .map(|t| t.as_str()),
            Some("teams:$params.id")
        );
        assert!(register_cache_templates(&mut registry).is_err());
    }
}
