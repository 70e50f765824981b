use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::state::scoreboard::Match;

/// Match document persisted by the storage layer, wrapped with bookkeeping metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time any field of the match was written.
    pub updated_at: SystemTime,
    /// The scored sets.
    pub document: Match,
}

/// Subset of [`MatchEntity`] used when listing matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchListItemEntity {
    /// Primary key of the match.
    pub id: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time any field of the match was written.
    pub updated_at: SystemTime,
}

impl MatchEntity {
    /// Wrap a freshly created document, stamping both timestamps with the current time.
    pub fn new(id: String, document: Match) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            document,
        }
    }
}

impl From<MatchEntity> for MatchListItemEntity {
    fn from(entity: MatchEntity) -> Self {
        Self {
            id: entity.id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Sort list items so the most recently updated match comes first.
pub fn newest_first(items: &mut [MatchListItemEntity]) {
    items.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
}
