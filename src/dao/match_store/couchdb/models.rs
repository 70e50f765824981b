use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    dao::{
        match_store::is_match_id,
        models::{MatchEntity, MatchListItemEntity},
    },
    state::scoreboard::{Match, SetMap, SetState},
};

pub const MATCH_PREFIX: &str = "match::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchMatchDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: MatchBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchBody {
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
    pub set: SetMap<SetState>,
}

impl CouchMatchDocument {
    pub fn from_entity(entity: MatchEntity) -> Self {
        Self {
            id: match_doc_id(&entity.id),
            rev: None,
            body: MatchBody {
                created_at: entity.created_at,
                updated_at: entity.updated_at,
                set: entity.document.set,
            },
        }
    }

    pub fn match_id(&self) -> &str {
        self.id.strip_prefix(MATCH_PREFIX).unwrap_or(&self.id)
    }

    pub fn into_entity(self) -> MatchEntity {
        MatchEntity {
            id: self.match_id().to_owned(),
            created_at: self.body.created_at,
            updated_at: self.body.updated_at,
            document: Match { set: self.body.set },
        }
    }
}

impl From<CouchMatchDocument> for MatchListItemEntity {
    fn from(doc: CouchMatchDocument) -> Self {
        doc.into_entity().into()
    }
}

pub fn match_doc_id(id: &str) -> String {
    format!("{MATCH_PREFIX}{id}")
}

/// Document id for a caller-supplied match id, `None` unless it is a generated id.
pub fn lookup_doc_id(id: &str) -> Option<String> {
    is_match_id(id).then(|| match_doc_id(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::match_store::new_match_id, state::scoreboard::MatchDefaults};

    #[test]
    fn document_round_trips_through_couch_shape() {
        let entity = MatchEntity::new("abc".into(), Match::new(&MatchDefaults::default()));
        let doc = CouchMatchDocument::from_entity(entity.clone());

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], "match::abc");
        assert!(json.get("_rev").is_none());
        assert_eq!(json["set"]["st"]["name"]["a"], "Team A");

        let parsed: CouchMatchDocument = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.into_entity(), entity);
    }

    #[test]
    fn only_generated_ids_reach_the_document_path() {
        let id = new_match_id();
        assert_eq!(lookup_doc_id(&id), Some(format!("match::{id}")));
        assert_eq!(lookup_doc_id("x/../_security"), None);
        assert_eq!(lookup_doc_id("x?rev=1-abc"), None);
    }
}
