#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{MatchEntity, MatchListItemEntity};
use crate::dao::storage::StorageResult;
use crate::state::scoreboard::{Match, MatchPatch};
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the document store holding one match per identifier.
pub trait MatchStore: Send + Sync {
    /// Persist a new match and return its generated identifier.
    fn create_match(&self, document: Match) -> BoxFuture<'static, StorageResult<String>>;
    /// Fetch a match by identifier.
    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// List every match, most recently updated first.
    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchListItemEntity>>>;
    /// Apply the field writes of `patch` as one partial update.
    ///
    /// Fails with [`StorageError::Missing`](crate::dao::storage::StorageError::Missing) when
    /// the match does not exist.
    fn update_match(&self, id: String, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>>;
    /// Check that the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Generate a fresh match identifier.
pub fn new_match_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Whether `id` has the shape produced by [`new_match_id`]: 32 lowercase hex digits.
pub fn is_match_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_well_formed() {
        assert!(is_match_id(&new_match_id()));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        for id in [
            "",
            "ghost",
            "x/../_security",
            "x?rev=1",
            "0123456789ABCDEF0123456789ABCDEF",
            "0123456789abcdef0123456789abcde/",
        ] {
            assert!(!is_match_id(id), "accepted {id:?}");
        }
    }
}
