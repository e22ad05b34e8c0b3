//! Infrastructure layer - Cache tiers, observability and collaborator services

pub mod cache;
pub mod logging;
pub mod observability;
pub mod team;
