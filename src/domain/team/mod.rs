//! Team domain module
//!
//! Teams are the demo resource whose reads are cached and whose writes
//! invalidate the `teams` group.

mod entity;
mod repository;

pub use entity::{Team, TeamId, TeamStatus};
pub use repository::{TeamQuery, TeamRepository};

#[cfg(test)]
pub use repository::MockTeamRepository;
