//! Team endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidatedJson};
use crate::domain::team::{Team, TeamQuery, TeamStatus};
use crate::infrastructure::team::{CreateTeamRequest, UpdateTeamRequest};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListTeamsParams {
    pub status: Option<TeamStatus>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl From<ListTeamsParams> for TeamQuery {
    fn from(params: ListTeamsParams) -> Self {
        Self {
            status: params.status,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTeamApiRequest {
    #[validate(length(min = 1, max = 50))]
    pub id: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTeamApiRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TeamStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TeamStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Team> for TeamResponse {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id().as_str().to_string(),
            name: team.name().to_string(),
            description: team.description().map(String::from),
            status: team.status(),
            created_at: team.created_at().to_rfc3339(),
            updated_at: team.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTeamsResponse {
    pub teams: Vec<TeamResponse>,
    pub total: usize,
}

/// GET /v1/teams
pub async fn list_teams(
    State(state): State<AppState>,
    Query(params): Query<ListTeamsParams>,
) -> Result<Json<ListTeamsResponse>, ApiError> {
    params.validate()?;
    debug!(status = ?params.status, "Listing teams");

    let teams = state.team_service.list(&params.into()).await?;
    let teams: Vec<TeamResponse> = teams.iter().map(TeamResponse::from).collect();
    let total = teams.len();

    Ok(Json(ListTeamsResponse { teams, total }))
}

/// GET /v1/teams/{id}
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TeamResponse>, ApiError> {
    debug!(team_id = %id, "Getting team");

    let team = state.team_service.get(&id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// POST /v1/teams
pub async fn create_team(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateTeamApiRequest>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    debug!(team_id = %request.id, "Creating team");

    let team = state
        .team_service
        .create(CreateTeamRequest {
            id: request.id,
            name: request.name,
            description: request.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TeamResponse::from(&team))))
}

/// PUT /v1/teams/{id}
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateTeamApiRequest>,
) -> Result<Json<TeamResponse>, ApiError> {
    debug!(team_id = %id, "Updating team");

    let team = state
        .team_service
        .update(
            &id,
            UpdateTeamRequest {
                name: request.name,
                description: request.description,
                status: request.status,
            },
        )
        .await?;

    Ok(Json(TeamResponse::from(&team)))
}

/// DELETE /v1/teams/{id}
pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    debug!(team_id = %id, "Deleting team");

    state.team_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
