use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, Document, doc, serialize_to_bson},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoMatchDocument, MongoMatchListItem, doc_id},
};
use crate::{
    dao::{
        match_store::{MatchStore, new_match_id},
        models::{MatchEntity, MatchListItemEntity},
        storage::StorageResult,
    },
    state::scoreboard::{Match, MatchPatch},
};

const MATCH_COLLECTION_NAME: &str = "matches";

/// MongoDB-backed [`MatchStore`]. Partial updates map to a single `$set`.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Held so the connection pool lives as long as the database handle.
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"updated_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("match_updated_at_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: MATCH_COLLECTION_NAME,
                index: "updated_at",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoMatchDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn list_collection(&self) -> Collection<MongoMatchListItem> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchListItem>(MATCH_COLLECTION_NAME)
    }

    async fn create_match(&self, document: Match) -> MongoResult<String> {
        let id = new_match_id();
        let record: MongoMatchDocument = MatchEntity::new(id.clone(), document).into();
        self.collection()
            .await
            .insert_one(&record)
            .await
            .map_err(|source| MongoDaoError::CreateMatch {
                id: id.clone(),
                source,
            })?;
        Ok(id)
    }

    async fn find_match(&self, id: String) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_matches(&self) -> MongoResult<Vec<MatchListItemEntity>> {
        let documents: Vec<MongoMatchListItem> = self
            .list_collection()
            .await
            .find(doc! {})
            .projection(doc! {"created_at": 1, "updated_at": 1})
            .sort(doc! {"updated_at": -1})
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListMatches { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn update_match(&self, id: String, patch: MatchPatch) -> MongoResult<()> {
        let update = set_document(&id, &patch)?;
        let result = self
            .collection()
            .await
            .update_one(doc_id(&id), doc! {"$set": update})
            .await
            .map_err(|source| MongoDaoError::UpdateMatch {
                id: id.clone(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::MatchNotFound { id });
        }
        Ok(())
    }
}

/// Translate a patch into the body of a `$set` operator, stamping `updated_at`.
fn set_document(id: &str, patch: &MatchPatch) -> MongoResult<Document> {
    let mut fields = Document::new();
    for write in patch.writes() {
        let path = write.path();
        let value =
            serialize_to_bson(&write.value()).map_err(|source| MongoDaoError::EncodeUpdate {
                id: id.to_owned(),
                path: path.clone(),
                source,
            })?;
        fields.insert(path, value);
    }
    fields.insert("updated_at", DateTime::from_system_time(SystemTime::now()));
    Ok(fields)
}

impl MatchStore for MongoMatchStore {
    fn create_match(&self, document: Match) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move { store.create_match(document).await.map_err(Into::into) })
    }

    fn find_match(&self, id: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_matches().await.map_err(Into::into) })
    }

    fn update_match(&self, id: String, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_match(id, patch).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
