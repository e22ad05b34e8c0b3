//! Team repository trait

use async_trait::async_trait;

use super::entity::{Team, TeamId, TeamStatus};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Query parameters for listing teams
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamQuery {
    pub status: Option<TeamStatus>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TeamQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TeamStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Repository for managing teams
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError>;

    async fn create(&self, team: Team) -> Result<Team, DomainError>;

    async fn update(&self, team: Team) -> Result<Team, DomainError>;

    async fn delete(&self, id: &TeamId) -> Result<bool, DomainError>;

    async fn list(&self, query: &TeamQuery) -> Result<Vec<Team>, DomainError>;
}
