//! Process-local match store used for local runs and tests.

use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;

use super::{MatchStore, new_match_id};
use crate::{
    dao::{
        models::{MatchEntity, MatchListItemEntity, newest_first},
        storage::{StorageError, StorageResult},
    },
    state::scoreboard::{Match, MatchPatch},
};

/// In-memory [`MatchStore`]. Clones share the same documents.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<String, MatchEntity>>,
}

impl MemoryMatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for MemoryMatchStore {
    fn create_match(&self, document: Match) -> BoxFuture<'static, StorageResult<String>> {
        let matches = self.matches.clone();
        Box::pin(async move {
            let id = new_match_id();
            matches.insert(id.clone(), MatchEntity::new(id.clone(), document));
            Ok(id)
        })
    }

    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let matches = self.matches.clone();
        Box::pin(async move { Ok(matches.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchListItemEntity>>> {
        let matches = self.matches.clone();
        Box::pin(async move {
            let mut items: Vec<MatchListItemEntity> = matches
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect();
            newest_first(&mut items);
            Ok(items)
        })
    }

    fn update_match(&self, id: String, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>> {
        let matches = self.matches.clone();
        Box::pin(async move {
            // The entry guard serializes writers of the same document.
            let mut entry = matches.get_mut(&id).ok_or_else(|| StorageError::missing(&id))?;
            patch.apply(&mut entry.document);
            entry.updated_at = SystemTime::now();
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
