//! In-memory team repository implementation

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::team::{Team, TeamId, TeamQuery, TeamRepository};
use crate::domain::DomainError;

/// In-memory implementation of TeamRepository
#[derive(Debug, Default)]
pub struct InMemoryTeamRepository {
    teams: Arc<RwLock<HashMap<String, Team>>>,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository seeded with teams
    pub fn with_teams(teams: Vec<Team>) -> Self {
        let map = teams
            .into_iter()
            .map(|t| (t.id().as_str().to_string(), t))
            .collect();

        Self {
            teams: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        let teams = self.teams.read().await;
        Ok(teams.get(id.as_str()).cloned())
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
        let mut teams = self.teams.write().await;
        let id = team.id().as_str().to_string();

        if teams.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "Team '{}' already exists",
                id
            )));
        }

        teams.insert(id, team.clone());
        Ok(team)
    }

    async fn update(&self, team: Team) -> Result<Team, DomainError> {
        let mut teams = self.teams.write().await;
        let id = team.id().as_str().to_string();

        if !teams.contains_key(&id) {
            return Err(DomainError::not_found(format!("Team '{}' not found", id)));
        }

        teams.insert(id, team.clone());
        Ok(team)
    }

    async fn delete(&self, id: &TeamId) -> Result<bool, DomainError> {
        let mut teams = self.teams.write().await;
        Ok(teams.remove(id.as_str()).is_some())
    }

    async fn list(&self, query: &TeamQuery) -> Result<Vec<Team>, DomainError> {
        let teams = self.teams.read().await;
        let mut result: Vec<Team> = teams
            .values()
            .filter(|t| query.status.is_none_or(|s| t.status() == s))
            .cloned()
            .collect();

        result.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(result.into_iter().skip(offset).take(limit).collect())
    }
}
