//! Team entity - demo resource served behind the response cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

const MAX_TEAM_ID_LENGTH: usize = 50;
const MAX_TEAM_NAME_LENGTH: usize = 100;

/// Team identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamId(String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();

        if id.is_empty() || id.len() > MAX_TEAM_ID_LENGTH {
            return Err(DomainError::validation(format!(
                "Team ID must be between 1 and {} characters",
                MAX_TEAM_ID_LENGTH
            )));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || id.starts_with('-')
            || id.ends_with('-')
        {
            return Err(DomainError::validation(format!(
                "Team ID '{}' may only contain alphanumeric characters and inner hyphens",
                id
            )));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TeamId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TeamId> for String {
    fn from(id: TeamId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    #[default]
    Active,
    Suspended,
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

impl std::str::FromStr for TeamStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            _ => Err(DomainError::validation(format!(
                "Unknown team status: {}. Valid statuses: active, suspended",
                s
            ))),
        }
    }
}

/// Team entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    status: TeamStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        validate_name(&name)?;
        let now = Utc::now();

        Ok(Self {
            id,
            name,
            description: None,
            status: TeamStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> TeamStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        self.touch();
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn set_status(&mut self, status: TeamStatus) {
        if self.status != status {
            self.status = status;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("Team name cannot be empty"));
    }

    if name.len() > MAX_TEAM_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Team name cannot exceed {} characters",
            MAX_TEAM_NAME_LENGTH
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_valid() {
        assert_eq!(TeamId::new("my-team").unwrap().as_str(), "my-team");
        assert!(TeamId::new("team-123").is_ok());
    }

    #[test]
    fn test_team_id_invalid() {
        assert!(TeamId::new("").is_err());
        assert!(TeamId::new("-team").is_err());
        assert!(TeamId::new("team-").is_err());
        assert!(TeamId::new("team_name").is_err());
        assert!(TeamId::new("a".repeat(51)).is_err());
    }

    #[test]
    fn test_team_id_deserialization_validates() {
        let ok: Result<TeamId, _> = serde_json::from_str("\"core\"");
        let bad: Result<TeamId, _> = serde_json::from_str("\"bad id\"");

        assert!(ok.is_ok());
        assert!(bad.is_err());
    }

    #[test]
    fn test_team_status_parse() {
        assert_eq!("active".parse::<TeamStatus>().unwrap(), TeamStatus::Active);
        assert_eq!("SUSPENDED".parse::<TeamStatus>().unwrap(), TeamStatus::Suspended);
        assert!("archived".parse::<TeamStatus>().is_err());
    }

    #[test]
    fn test_team_creation() {
        let team = Team::new(TeamId::new("core").unwrap(), "Core")
            .unwrap()
            .with_description("Platform team");

        assert_eq!(team.name(), "Core");
        assert_eq!(team.description(), Some("Platform team"));
        assert_eq!(team.status(), TeamStatus::Active);
    }

    #[test]
    fn test_team_invalid_name() {
        assert!(Team::new(TeamId::new("core").unwrap(), "  ").is_err());
    }

    #[test]
    fn test_set_status_touches() {
        let mut team = Team::new(TeamId::new("core").unwrap(), "Core").unwrap();
        let before = team.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(5));
        team.set_status(TeamStatus::Suspended);

        assert_eq!(team.status(), TeamStatus::Suspended);
        assert!(team.updated_at() > before);
    }
}
