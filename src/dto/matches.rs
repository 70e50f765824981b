//! Request and response bodies of the `/matches` REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{MatchEntity, MatchListItemEntity},
    dto::{format_system_time, validation::validate_display_name},
    state::scoreboard::{Match, SetPlayers},
};

/// Request to add a signed delta to a team's score.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScoreDeltaRequest {
    /// Usually `1` or `-1`; any value is accepted.
    pub delta: i64,
}

/// Request to rename a team within a set.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RenameTeamRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
}

/// Request to rename both players of a team's pair.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RenamePlayersRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name1: String,
    #[validate(custom(function = "validate_display_name"))]
    pub name2: String,
}

/// Replacement for the whole player object of a set.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ReplacePlayersRequest {
    /// `{"a": [Player, Player], "b": [Player, Player]}`
    #[schema(value_type = Object)]
    pub players: SetPlayers,
}

/// Identifier of a freshly created match.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateMatchResponse {
    pub id: String,
}

/// Document derived locally after a write; the feed carries the stored value.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchStateResponse {
    pub id: String,
    #[serde(rename = "match")]
    #[schema(value_type = Object)]
    pub document: Match,
}

/// Stored match with its bookkeeping timestamps.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchRecordResponse {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(rename = "match")]
    #[schema(value_type = Object)]
    pub document: Match,
}

/// Row of the match listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchListItem {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MatchEntity> for MatchRecordResponse {
    fn from(entity: MatchEntity) -> Self {
        Self {
            id: entity.id,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
            document: entity.document,
        }
    }
}

impl From<MatchListItemEntity> for MatchListItem {
    fn from(entity: MatchListItemEntity) -> Self {
        Self {
            id: entity.id,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}
