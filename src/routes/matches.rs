use std::convert::Infallible;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::{
        Response,
        sse::{Event, Sse},
    },
    routing::{get, post, put},
};
use axum_valid::Valid;
use futures::Stream;

use crate::{
    dto::matches::{
        CreateMatchResponse, MatchListItem, MatchRecordResponse, MatchStateResponse,
        RenamePlayersRequest, RenameTeamRequest, ReplacePlayersRequest, ScoreDeltaRequest,
    },
    error::AppError,
    routes::auth::session_token,
    services::{auth_service, feed_service, match_service, sse_service},
    state::{
        SharedState,
        scoreboard::{PlayerSlot, SetLabel, TeamLabel},
    },
};

/// Match endpoints; every route requires a live session.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/matches", get(list_matches).post(create_match))
        .route("/matches/{id}", get(get_match))
        .route("/matches/{id}/events", get(match_events))
        .route(
            "/matches/{id}/sets/{set}/teams/{team}/score",
            post(update_score),
        )
        .route("/matches/{id}/sets/{set}/teams/{team}/name", put(rename_team))
        .route(
            "/matches/{id}/sets/{set}/teams/{team}/players",
            put(rename_players),
        )
        .route(
            "/matches/{id}/sets/{set}/teams/{team}/players/{slot}/serve",
            post(toggle_serve),
        )
        .route(
            "/matches/{id}/sets/{set}/teams/{team}/swap",
            post(swap_players),
        )
        .route("/matches/{id}/sets/{set}/players", put(replace_players))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

/// List matches, most recently updated first.
#[utoipa::path(
    get,
    path = "/matches",
    tag = "matches",
    params(("x-session-token" = String, Header, description = "Session token issued by /auth/login")),
    responses((status = 200, description = "Known matches", body = [MatchListItem]))
)]
pub async fn list_matches(
    State(state): State<SharedState>,
) -> Result<Json<Vec<MatchListItem>>, AppError> {
    Ok(Json(match_service::list(&state).await?))
}

/// Create a match with default names and zero scores.
#[utoipa::path(
    post,
    path = "/matches",
    tag = "matches",
    params(("x-session-token" = String, Header, description = "Session token issued by /auth/login")),
    responses((status = 200, description = "Match created", body = CreateMatchResponse))
)]
pub async fn create_match(
    State(state): State<SharedState>,
) -> Result<Json<CreateMatchResponse>, AppError> {
    Ok(Json(match_service::create(&state).await?))
}

/// Fetch the stored match.
#[utoipa::path(
    get,
    path = "/matches/{id}",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier")
    ),
    responses(
        (status = 200, description = "Stored match", body = MatchRecordResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn get_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MatchRecordResponse>, AppError> {
    Ok(Json(match_service::get(&state, &id).await?))
}

/// Stream `match.snapshot` events: the current document first, then one per change.
#[utoipa::path(
    get,
    path = "/matches/{id}/events",
    tag = "matches",
    params(
        ("token" = String, Query, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier")
    ),
    responses((status = 200, description = "Server-sent `match.snapshot` events", content_type = "text/event-stream", body = String))
)]
pub async fn match_events(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (snapshot, receiver) = feed_service::subscribe(&state, &id).await?;
    let feed_id = id.clone();
    Ok(sse_service::to_sse_stream(snapshot, receiver, id, move || {
        feed_service::release(&state, &feed_id)
    }))
}

/// Add a signed delta to a team's score.
#[utoipa::path(
    post,
    path = "/matches/{id}/sets/{set}/teams/{team}/score",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier"),
        ("set" = SetLabel, Path, description = "Set label"),
        ("team" = TeamLabel, Path, description = "Team label")
    ),
    request_body = ScoreDeltaRequest,
    responses(
        (status = 200, description = "Score updated", body = MatchStateResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn update_score(
    State(state): State<SharedState>,
    Path((id, set, team)): Path<(String, SetLabel, TeamLabel)>,
    Valid(Json(payload)): Valid<Json<ScoreDeltaRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::update_score(&state, &id, set, team, payload.delta).await?,
    ))
}

/// Rename a team within a set.
#[utoipa::path(
    put,
    path = "/matches/{id}/sets/{set}/teams/{team}/name",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier"),
        ("set" = SetLabel, Path, description = "Set label"),
        ("team" = TeamLabel, Path, description = "Team label")
    ),
    request_body = RenameTeamRequest,
    responses(
        (status = 200, description = "Team renamed", body = MatchStateResponse),
        (status = 400, description = "Blank name"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn rename_team(
    State(state): State<SharedState>,
    Path((id, set, team)): Path<(String, SetLabel, TeamLabel)>,
    Valid(Json(payload)): Valid<Json<RenameTeamRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::update_name(&state, &id, set, team, &payload.name).await?,
    ))
}

/// Rename both players of a team's pair.
#[utoipa::path(
    put,
    path = "/matches/{id}/sets/{set}/teams/{team}/players",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier"),
        ("set" = SetLabel, Path, description = "Set label"),
        ("team" = TeamLabel, Path, description = "Team label")
    ),
    request_body = RenamePlayersRequest,
    responses(
        (status = 200, description = "Players renamed", body = MatchStateResponse),
        (status = 400, description = "Blank name"),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn rename_players(
    State(state): State<SharedState>,
    Path((id, set, team)): Path<(String, SetLabel, TeamLabel)>,
    Valid(Json(payload)): Valid<Json<RenamePlayersRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::update_player_name(&state, &id, set, team, &payload.name1, &payload.name2)
            .await?,
    ))
}

/// Toggle a player's serve flag.
#[utoipa::path(
    post,
    path = "/matches/{id}/sets/{set}/teams/{team}/players/{slot}/serve",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier"),
        ("set" = SetLabel, Path, description = "Set label"),
        ("team" = TeamLabel, Path, description = "Team label"),
        ("slot" = PlayerSlot, Path, description = "Player slot, `0` or `1`")
    ),
    responses(
        (status = 200, description = "Serve toggled", body = MatchStateResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn toggle_serve(
    State(state): State<SharedState>,
    Path((id, set, team, slot)): Path<(String, SetLabel, TeamLabel, PlayerSlot)>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::toggle_serve(&state, &id, set, team, slot).await?,
    ))
}

/// Reverse the order of a team's player pair.
#[utoipa::path(
    post,
    path = "/matches/{id}/sets/{set}/teams/{team}/swap",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier"),
        ("set" = SetLabel, Path, description = "Set label"),
        ("team" = TeamLabel, Path, description = "Team label")
    ),
    responses(
        (status = 200, description = "Players swapped", body = MatchStateResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn swap_players(
    State(state): State<SharedState>,
    Path((id, set, team)): Path<(String, SetLabel, TeamLabel)>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::swap_players(&state, &id, set, team).await?,
    ))
}

/// Replace the whole player object of a set.
#[utoipa::path(
    put,
    path = "/matches/{id}/sets/{set}/players",
    tag = "matches",
    params(
        ("x-session-token" = String, Header, description = "Session token issued by /auth/login"),
        ("id" = String, Path, description = "Match identifier"),
        ("set" = SetLabel, Path, description = "Set label")
    ),
    request_body = ReplacePlayersRequest,
    responses(
        (status = 200, description = "Players replaced", body = MatchStateResponse),
        (status = 404, description = "Unknown match")
    )
)]
pub async fn replace_players(
    State(state): State<SharedState>,
    Path((id, set)): Path<(String, SetLabel)>,
    Valid(Json(payload)): Valid<Json<ReplacePlayersRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(
        match_service::update_player(&state, &id, set, payload.players).await?,
    ))
}

async fn require_session(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(req.headers(), req.uri());
    auth_service::authorize(&state, token.as_deref())?;
    Ok(next.run(req).await)
}
