use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    dao::{match_store::MatchStore, models::MatchEntity},
    dto::sse::ServerEvent,
    error::ServiceError,
    services::match_service::require_match_id,
    state::SharedState,
};

/// Subscribe to the feed of `match_id`.
///
/// The receiver is registered before the current snapshot is read so no write can slip
/// between the two. The snapshot is `None` while the match does not exist. Callers hand
/// the feed back with [`release`] once the receiver is dropped.
pub async fn subscribe(
    state: &SharedState,
    match_id: &str,
) -> Result<(Option<ServerEvent>, broadcast::Receiver<ServerEvent>), ServiceError> {
    require_match_id(match_id)?;
    let store = state.require_match_store().await?;
    let receiver = state.feeds().subscribe(match_id);
    match store.find_match(match_id.to_owned()).await {
        Ok(found) => Ok((found.and_then(encode_snapshot), receiver)),
        Err(err) => {
            drop(receiver);
            release(state, match_id);
            Err(err.into())
        }
    }
}

/// Drop the hub of `match_id` when no subscriber is left.
pub fn release(state: &SharedState, match_id: &str) {
    state.feeds().release(match_id);
}

/// Re-read `match_id` in the background and push the stored document to its subscribers.
///
/// Re-reads of the same match run one after another, so the last snapshot published is
/// never older than the last write that called this.
pub fn notify_changed(state: &SharedState, store: Arc<dyn MatchStore>, match_id: String) {
    let Some(publisher) = state.feeds().publisher(&match_id) else {
        return;
    };
    tokio::spawn(async move {
        let _turn = publisher.turn().await;
        match store.find_match(match_id.clone()).await {
            Ok(Some(entity)) => {
                if let Some(event) = encode_snapshot(entity) {
                    publisher.publish(event);
                    debug!(%match_id, "match snapshot published");
                }
            }
            Ok(None) => warn!(%match_id, "changed match vanished before it could be published"),
            Err(err) => warn!(%match_id, error = %err, "failed to re-read match for its feed"),
        }
    });
}

fn encode_snapshot(entity: MatchEntity) -> Option<ServerEvent> {
    let match_id = entity.id.clone();
    match ServerEvent::match_snapshot(entity) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(%match_id, error = %err, "failed to serialise match snapshot");
            None
        }
    }
}
