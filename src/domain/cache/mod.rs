//! Cache domain - key templates, operation registry and tier contract

mod key;
mod operation;
mod provenance;
mod repository;

pub use key::{
    canonical_json, canonical_text, group_of, KeyResolver, KeyTemplate, RequestContext, ResolvedKey,
};
pub use operation::{OperationKey, OperationRegistry};
pub use provenance::{Provenance, PROVENANCE_HEADER};
pub use repository::{effective_ttl, Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
