//! Server-computed page models rendered by the browser client.
//!
//! A page always carries its [`Chrome`]; its content is only present for signed-in users.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};

use crate::{
    dto::matches::MatchListItem,
    state::{
        auth::AuthUser,
        scoreboard::{Match, Player, SetLabel, TeamLabel},
    },
};

/// Title shown in the header of every page.
pub const APP_TITLE: &str = "Courtside";

/// Query string of `GET /view`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViewQuery {
    /// Identifier of the match to show; absent for the dashboard.
    pub m: Option<String>,
    /// Session token, for clients that cannot set headers.
    pub token: Option<String>,
}

/// Whole page: chrome plus optional content.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageView {
    pub chrome: Chrome,
    pub content: Option<PageContent>,
}

/// Header shown regardless of authentication.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct Chrome {
    pub title: String,
    pub user: Option<AuthUser>,
    pub navigation: Vec<NavLink>,
}

/// Link rendered in the header or as an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    /// HTTP method to use when following the link.
    pub method: String,
}

impl NavLink {
    /// Link followed with the given method.
    pub fn new(label: &str, method: &str, href: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            href: href.into(),
            method: method.to_string(),
        }
    }
}

/// Content section of a page.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    Dashboard(DashboardView),
    Board(BoardView),
}

/// Landing page listing recent matches.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardView {
    pub matches: Vec<MatchListItem>,
    pub create: NavLink,
}

/// Scoreboard of one match; `tabs` stays `null` until a snapshot exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoardView {
    pub match_id: String,
    pub tabs: Option<Vec<SetTab>>,
}

/// One set of the board.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetTab {
    pub set: SetLabel,
    pub caption: String,
    pub teams: Vec<TeamPanel>,
}

/// One side of a set tab.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamPanel {
    pub team: TeamLabel,
    pub name: String,
    pub score: i64,
    /// Either player of the team holds the serve.
    pub serving: bool,
    pub players: Vec<Player>,
}

impl BoardView {
    /// Board for `match_id`, with tabs built from `document` when one was found.
    pub fn new(match_id: String, document: Option<&Match>) -> Self {
        Self {
            match_id,
            tabs: document.map(|document| {
                document
                    .set
                    .iter()
                    .map(|(set, state)| SetTab {
                        set,
                        caption: set.caption().to_string(),
                        teams: TeamLabel::ALL
                            .into_iter()
                            .map(|team| {
                                let players = state.player[team].to_vec();
                                TeamPanel {
                                    team,
                                    name: state.name[team].clone(),
                                    score: state.score[team],
                                    serving: players.iter().any(|player| player.serve),
                                    players,
                                }
                            })
                            .collect(),
                    })
                    .collect()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::scoreboard::{MatchDefaults, PlayerSlot, serve_toggle};

    #[test]
    fn board_marks_the_serving_team() {
        let mut document = Match::new(&MatchDefaults::default());
        serve_toggle(&document, SetLabel::Second, TeamLabel::B, PlayerSlot::First)
            .apply(&mut document);

        let board = BoardView::new("m1".into(), Some(&document));
        let tabs = board.tabs.unwrap();
        assert_eq!(tabs.len(), 3);
        assert_eq!(tabs[1].caption, "2nd");
        assert!(!tabs[1].teams[0].serving);
        assert!(tabs[1].teams[1].serving);
        assert!(!tabs[0].teams[1].serving);
    }

    #[test]
    fn page_content_is_tagged() {
        let page = PageView {
            chrome: Chrome {
                title: APP_TITLE.into(),
                user: None,
                navigation: Vec::new(),
            },
            content: Some(PageContent::Board(BoardView::new("ghost".into(), None))),
        };
        let value = serde_json::to_value(page).unwrap();
        assert_eq!(value["content"]["kind"], json!("board"));
        assert_eq!(value["content"]["tabs"], json!(null));
        assert!(value["chrome"].get("user").is_none());
    }
}
