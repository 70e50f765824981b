use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Courtside Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::session,
        crate::routes::auth::events,
        crate::routes::matches::list_matches,
        crate::routes::matches::create_match,
        crate::routes::matches::get_match,
        crate::routes::matches::match_events,
        crate::routes::matches::update_score,
        crate::routes::matches::rename_team,
        crate::routes::matches::rename_players,
        crate::routes::matches::toggle_serve,
        crate::routes::matches::swap_players,
        crate::routes::matches::replace_players,
        crate::routes::view::view,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::LoginRequest,
            crate::dto::auth::LoginResponse,
            crate::dto::auth::SessionResponse,
            crate::dto::sse::AuthStateEvent,
            crate::dto::matches::ScoreDeltaRequest,
            crate::dto::matches::RenameTeamRequest,
            crate::dto::matches::RenamePlayersRequest,
            crate::dto::matches::ReplacePlayersRequest,
            crate::dto::matches::CreateMatchResponse,
            crate::dto::matches::MatchStateResponse,
            crate::dto::matches::MatchRecordResponse,
            crate::dto::matches::MatchListItem,
            crate::dto::view::PageView,
            crate::state::auth::AuthUser,
            crate::state::scoreboard::Player,
            crate::state::scoreboard::SetLabel,
            crate::state::scoreboard::TeamLabel,
            crate::state::scoreboard::PlayerSlot,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Sessions and their change stream"),
        (name = "matches", description = "Match documents, updates and live feeds"),
        (name = "view", description = "Server-computed page models"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/auth/login",
            "/auth/events",
            "/matches",
            "/matches/{id}/events",
            "/matches/{id}/sets/{set}/teams/{team}/players/{slot}/serve",
            "/matches/{id}/sets/{set}/players",
            "/view",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
