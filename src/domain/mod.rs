//! Domain layer - Core caching model and collaborator entities

pub mod cache;
pub mod error;
pub mod team;

pub use cache::{
    Cache, CacheExt, KeyResolver, KeyTemplate, OperationKey, OperationRegistry, Provenance,
    RequestContext, ResolvedKey, PROVENANCE_HEADER,
};
pub use error::DomainError;
pub use team::{Team, TeamId, TeamQuery, TeamRepository, TeamStatus};
