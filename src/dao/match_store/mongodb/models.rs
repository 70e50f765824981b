use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::{
    dao::models::{MatchEntity, MatchListItemEntity},
    state::scoreboard::{Match, SetMap, SetState},
};

/// Shape of a match inside the `matches` collection.
///
/// The `set` key sits at the document root so field paths such as `set.st.score.a`
/// address it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub set: SetMap<SetState>,
}

/// Projection used when listing matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchListItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            set: value.document.set,
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            document: Match { set: value.set },
        }
    }
}

impl From<MongoMatchListItem> for MatchListItemEntity {
    fn from(value: MongoMatchListItem) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}
