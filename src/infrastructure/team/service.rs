//! Team service for team management

use std::sync::Arc;

use tracing::info;

use crate::domain::team::{Team, TeamId, TeamQuery, TeamRepository, TeamStatus};
use crate::domain::DomainError;

/// Request for creating a new team
#[derive(Debug, Clone)]
pub struct CreateTeamRequest {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Request for updating a team
#[derive(Debug, Clone, Default)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TeamStatus>,
}

/// Team service for managing teams
#[derive(Clone)]
pub struct TeamService {
    repository: Arc<dyn TeamRepository>,
}

impl std::fmt::Debug for TeamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamService").finish_non_exhaustive()
    }
}

impl TeamService {
    pub fn new(repository: Arc<dyn TeamRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, request: CreateTeamRequest) -> Result<Team, DomainError> {
        info!(id = %request.id, name = %request.name, "Creating team");

        let team_id = TeamId::new(&request.id)?;
        let mut team = Team::new(team_id, &request.name)?;

        if let Some(desc) = request.description {
            team.set_description(Some(desc));
        }

        self.repository.create(team).await
    }

    pub async fn get(&self, id: &str) -> Result<Team, DomainError> {
        let team_id = TeamId::new(id)?;

        self.repository
            .get(&team_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", id)))
    }

    pub async fn list(&self, query: &TeamQuery) -> Result<Vec<Team>, DomainError> {
        self.repository.list(query).await
    }

    pub async fn update(&self, id: &str, request: UpdateTeamRequest) -> Result<Team, DomainError> {
        info!(id = %id, "Updating team");

        let mut team = self.get(id).await?;

        if let Some(name) = request.name {
            team.set_name(name)?;
        }

        if let Some(desc) = request.description {
            team.set_description(Some(desc));
        }

        if let Some(status) = request.status {
            team.set_status(status);
        }

        self.repository.update(team).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        info!(id = %id, "Deleting team");

        let team_id = TeamId::new(id)?;

        if !self.repository.delete(&team_id).await? {
            return Err(DomainError::not_found(format!("Team '{}' not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::team::MockTeamRepository;
    use crate::infrastructure::team::InMemoryTeamRepository;

    fn service() -> TeamService {
        TeamService::new(Arc::new(InMemoryTeamRepository::new()))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = service();
        service
            .create(CreateTeamRequest {
                id: "core".to_string(),
                name: "Core".to_string(),
                description: Some("Platform".to_string()),
            })
            .await
            .unwrap();

        let team = service.get("core").await.unwrap();
        assert_eq!(team.description(), Some("Platform"));
    }

    #[tokio::test]
    async fn test_create_invalid_id() {
        let result = service()
            .create(CreateTeamRequest {
                id: "not valid".to_string(),
                name: "X".to_string(),
                description: None,
            })
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_status() {
        let service = service();
        service
            .create(CreateTeamRequest {
                id: "core".to_string(),
                name: "Core".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let updated = service
            .update(
                "core",
                UpdateTeamRequest {
                    status: Some(TeamStatus::Suspended),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status(), TeamStatus::Suspended);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let result = service().delete("ghost").await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_repository_errors_propagate() {
        let mut repo = MockTeamRepository::new();
        repo.expect_list()
            .returning(|_| Err(DomainError::internal("backend down")));

        let service = TeamService::new(Arc::new(repo));
        let result = service.list(&TeamQuery::new()).await;

        assert!(matches!(result, Err(DomainError::Internal { .. })));
    }
}
