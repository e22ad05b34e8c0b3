//! Which tier, if any, satisfied a read

use serde::{Deserialize, Serialize};

/// Response header carrying the provenance marker
pub const PROVENANCE_HEADER: &str = "x-cache";

/// Provenance of a cached read; informational only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "HIT:L1")]
    L1Hit,
    #[serde(rename = "HIT:L2")]
    L2Hit,
    #[serde(rename = "MISS")]
    Miss,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1Hit => "HIT:L1",
            Self::L2Hit => "HIT:L2",
            Self::Miss => "MISS",
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::L1Hit | Self::L2Hit)
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
