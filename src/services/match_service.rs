//! Match operations: read the current document, derive one patch, write it once.

use tracing::{debug, info};

use crate::{
    dao::match_store::is_match_id,
    dto::matches::{CreateMatchResponse, MatchListItem, MatchRecordResponse, MatchStateResponse},
    error::ServiceError,
    services::feed_service,
    state::{
        SharedState,
        scoreboard::{
            Match, MatchPatch, ModelError, PlayerSlot, SetLabel, SetPlayers, TeamLabel, name_update,
            player_names_update, players_update, score_update, serve_toggle, swap_update,
        },
    },
};

/// Create a match seeded with the configured defaults and return its identifier.
pub async fn create(state: &SharedState) -> Result<CreateMatchResponse, ServiceError> {
    let store = state.require_match_store().await?;
    let document = Match::new(state.config().match_defaults());
    let id = store.create_match(document).await?;
    info!(match_id = %id, "match created");
    feed_service::notify_changed(state, store, id.clone());
    Ok(CreateMatchResponse { id })
}

/// Load a match with its timestamps.
pub async fn get(state: &SharedState, match_id: &str) -> Result<MatchRecordResponse, ServiceError> {
    require_match_id(match_id)?;
    let store = state.require_match_store().await?;
    store
        .find_match(match_id.to_owned())
        .await?
        .map(Into::into)
        .ok_or_else(|| not_found(match_id))
}

/// List every match, most recently updated first.
pub async fn list(state: &SharedState) -> Result<Vec<MatchListItem>, ServiceError> {
    let store = state.require_match_store().await?;
    let items = store.list_matches().await?;
    Ok(items.into_iter().map(Into::into).collect())
}

/// Add `delta` to a team's score.
pub async fn update_score(
    state: &SharedState,
    match_id: &str,
    set: SetLabel,
    team: TeamLabel,
    delta: i64,
) -> Result<MatchStateResponse, ServiceError> {
    apply_update(state, match_id, |current| {
        Ok(score_update(current, set, team, delta))
    })
    .await
}

/// Rename a team within a set.
pub async fn update_name(
    state: &SharedState,
    match_id: &str,
    set: SetLabel,
    team: TeamLabel,
    name: &str,
) -> Result<MatchStateResponse, ServiceError> {
    let patch = name_update(set, team, name)?;
    apply_update(state, match_id, |_| Ok(patch)).await
}

/// Rename both players of a team's pair.
pub async fn update_player_name(
    state: &SharedState,
    match_id: &str,
    set: SetLabel,
    team: TeamLabel,
    name1: &str,
    name2: &str,
) -> Result<MatchStateResponse, ServiceError> {
    let patch = player_names_update(set, team, name1, name2)?;
    apply_update(state, match_id, |_| Ok(patch)).await
}

/// Replace the whole player object of a set, keeping a single server across the match.
pub async fn update_player(
    state: &SharedState,
    match_id: &str,
    set: SetLabel,
    players: SetPlayers,
) -> Result<MatchStateResponse, ServiceError> {
    apply_update(state, match_id, |current| players_update(current, set, players)).await
}

/// Flip a player's serve flag, keeping a single server across the match.
pub async fn toggle_serve(
    state: &SharedState,
    match_id: &str,
    set: SetLabel,
    team: TeamLabel,
    slot: PlayerSlot,
) -> Result<MatchStateResponse, ServiceError> {
    apply_update(state, match_id, |current| {
        Ok(serve_toggle(current, set, team, slot))
    })
    .await
}

/// Reverse the order of a team's player pair.
pub async fn swap_players(
    state: &SharedState,
    match_id: &str,
    set: SetLabel,
    team: TeamLabel,
) -> Result<MatchStateResponse, ServiceError> {
    apply_update(state, match_id, |current| Ok(swap_update(current, set, team))).await
}

async fn apply_update<F>(
    state: &SharedState,
    match_id: &str,
    build: F,
) -> Result<MatchStateResponse, ServiceError>
where
    F: FnOnce(&Match) -> Result<MatchPatch, ModelError>,
{
    require_match_id(match_id)?;
    let store = state.require_match_store().await?;
    let current = store
        .find_match(match_id.to_owned())
        .await?
        .ok_or_else(|| not_found(match_id))?;

    let patch = build(&current.document)?;
    let document = patch.apply_to(&current.document);
    let writes = patch.writes().len();
    store.update_match(match_id.to_owned(), patch).await?;
    debug!(%match_id, writes, "match updated");

    feed_service::notify_changed(state, store, match_id.to_owned());
    Ok(MatchStateResponse {
        id: match_id.to_owned(),
        document,
    })
}

fn not_found(match_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("match {match_id}"))
}

/// Reject identifiers that no store could have generated.
pub(crate) fn require_match_id(match_id: &str) -> Result<(), ServiceError> {
    if is_match_id(match_id) {
        Ok(())
    } else {
        Err(not_found(match_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::{MatchStore, memory::MemoryMatchStore, new_match_id},
        state::{
            AppState,
            scoreboard::{MatchDefaults, Player, TeamMap},
        },
    };

    async fn ready_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state.set_match_store(Arc::new(MemoryMatchStore::new())).await;
        state
    }

    #[tokio::test]
    async fn create_then_get_returns_default_document() {
        let state = ready_state().await;
        let created = create(&state).await.unwrap();
        assert_eq!(created.id.len(), 32);

        let record = get(&state, &created.id).await.unwrap();
        assert_eq!(record.document, Match::new(&MatchDefaults::default()));
        assert_eq!(list(&state).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn score_updates_accumulate_and_go_negative() {
        let state = ready_state().await;
        let id = create(&state).await.unwrap().id;

        for delta in [1, 1, -1] {
            update_score(&state, &id, SetLabel::First, TeamLabel::A, delta)
                .await
                .unwrap();
        }
        let after = update_score(&state, &id, SetLabel::First, TeamLabel::B, -1)
            .await
            .unwrap();
        assert_eq!(after.document.set.st.score, TeamMap::new(1, -1));

        let stored = get(&state, &id).await.unwrap();
        assert_eq!(stored.document, after.document);
    }

    #[tokio::test]
    async fn blank_names_never_reach_the_store() {
        let state = ready_state().await;
        let id = create(&state).await.unwrap().id;
        let before = get(&state, &id).await.unwrap();

        let err = update_name(&state, &id, SetLabel::Second, TeamLabel::B, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let err = update_player_name(&state, &id, SetLabel::Second, TeamLabel::B, "Lee", "")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let after = get(&state, &id).await.unwrap();
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after.document, before.document);
    }

    #[tokio::test]
    async fn renames_are_trimmed() {
        let state = ready_state().await;
        let id = create(&state).await.unwrap().id;

        update_name(&state, &id, SetLabel::Third, TeamLabel::A, " Smashers ")
            .await
            .unwrap();
        let updated = update_player_name(&state, &id, SetLabel::Third, TeamLabel::A, "Lin ", " Dan")
            .await
            .unwrap();
        let set = &updated.document.set.rd;
        assert_eq!(set.name.a, "Smashers");
        assert_eq!(set.player.a[0].name, "Lin");
        assert_eq!(set.player.a[1].name, "Dan");
    }

    #[tokio::test]
    async fn serve_moves_across_sets() {
        let state = ready_state().await;
        let id = create(&state).await.unwrap().id;

        toggle_serve(&state, &id, SetLabel::First, TeamLabel::A, PlayerSlot::Second)
            .await
            .unwrap();
        let moved = toggle_serve(&state, &id, SetLabel::Third, TeamLabel::B, PlayerSlot::First)
            .await
            .unwrap();
        assert_eq!(moved.document.serve_count(), 1);

        let stored = get(&state, &id).await.unwrap().document;
        assert_eq!(
            stored.server(),
            Some((SetLabel::Third, TeamLabel::B, PlayerSlot::First))
        );
    }

    #[tokio::test]
    async fn swap_and_replace_players() {
        let state = ready_state().await;
        let id = create(&state).await.unwrap().id;

        let swapped = swap_players(&state, &id, SetLabel::Second, TeamLabel::A)
            .await
            .unwrap();
        assert_eq!(swapped.document.set.nd.player.a[0].name, "Player A2");

        let players = TeamMap::new(
            [Player::named("Ann"), Player::named("Bea")],
            [
                Player {
                    name: "Cid".into(),
                    serve: true,
                },
                Player::named("Dee"),
            ],
        );
        let replaced = update_player(&state, &id, SetLabel::Second, players.clone())
            .await
            .unwrap();
        assert_eq!(replaced.document.set.nd.player, players);
    }

    #[tokio::test]
    async fn replacing_players_keeps_one_server_and_real_names() {
        let state = ready_state().await;
        let id = create(&state).await.unwrap().id;
        toggle_serve(&state, &id, SetLabel::First, TeamLabel::A, PlayerSlot::First)
            .await
            .unwrap();
        let before = get(&state, &id).await.unwrap();

        let serving = |name: &str| Player {
            name: name.into(),
            serve: true,
        };
        let crowded = TeamMap::new(
            [serving("Ann"), serving("Bea")],
            [Player::named("Cid"), Player::named("Dee")],
        );
        let err = update_player(&state, &id, SetLabel::Second, crowded)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let unnamed = TeamMap::new(
            [Player::named("Ann"), Player::named("")],
            [Player::named("Cid"), Player::named(" ")],
        );
        let err = update_player(&state, &id, SetLabel::Second, unnamed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let after = get(&state, &id).await.unwrap();
        assert_eq!(after.document, before.document);

        let moved = TeamMap::new(
            [Player::named("Ann"), Player::named("Bea")],
            [serving("Cid"), Player::named("Dee")],
        );
        let replaced = update_player(&state, &id, SetLabel::Second, moved)
            .await
            .unwrap();
        assert_eq!(replaced.document.serve_count(), 1);
        assert_eq!(
            get(&state, &id).await.unwrap().document.server(),
            Some((SetLabel::Second, TeamLabel::B, PlayerSlot::First))
        );
    }

    #[tokio::test]
    async fn unknown_match_is_not_found() {
        let state = ready_state().await;
        let err = update_score(&state, "ghost", SetLabel::First, TeamLabel::A, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(matches!(
            get(&state, "ghost").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            get(&state, &new_match_id()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn degraded_mode_rejects_operations() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(create(&state).await, Err(ServiceError::Degraded)));

        let store: Arc<dyn MatchStore> = Arc::new(MemoryMatchStore::new());
        state.set_match_store(store).await;
        state.update_degraded(true);
        assert!(matches!(list(&state).await, Err(ServiceError::Degraded)));
    }
}
