use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tracing::{info, warn};

use crate::{dto::sse::ServerEvent, state::auth::AuthUser};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(KEEP_ALIVE_INTERVAL)
        .text("keep-alive")
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response.
///
/// `initial` is sent before anything read from `receiver`. The forwarder stops once the
/// client disconnects, drops the receiver and then runs `on_close`.
pub fn to_sse_stream<F>(
    initial: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
    match_id: String,
    on_close: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    F: FnOnce() + Send + 'static,
{
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        forward(initial, &mut receiver, &tx, &match_id).await;
        drop(receiver);
        on_close();
        info!(%match_id, "match feed disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(keep_alive())
}

async fn forward(
    initial: Option<ServerEvent>,
    receiver: &mut broadcast::Receiver<ServerEvent>,
    tx: &mpsc::Sender<Result<Event, Infallible>>,
    match_id: &str,
) {
    if let Some(payload) = initial {
        if tx.send(Ok(to_event(payload))).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            recv_result = receiver.recv() => {
                match recv_result {
                    Ok(payload) => {
                        if tx.send(Ok(to_event(payload))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        // The next snapshot is complete, so missed ones can be dropped.
                        warn!(%match_id, skipped, "match feed subscriber lagged");
                        continue;
                    }
                }
            }
        }
    }
}

/// SSE response yielding the current session state and then each change.
///
/// Unknown tokens get a single `null` state. The stream stays open after the session ends
/// so clients do not reconnect in a loop.
pub fn auth_stream(
    receiver: Option<watch::Receiver<Option<AuthUser>>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        match receiver {
            Some(receiver) => {
                let mut updates = WatchStream::new(receiver);
                while let Some(user) = updates.next().await {
                    if let Some(event) = auth_event(user) {
                        yield Ok(event);
                    }
                }
            }
            None => {
                if let Some(event) = auth_event(None) {
                    yield Ok(event);
                }
            }
        }
        futures::future::pending::<()>().await;
    };

    Sse::new(stream).keep_alive(keep_alive())
}

fn auth_event(user: Option<AuthUser>) -> Option<Event> {
    match ServerEvent::auth_state(user) {
        Ok(payload) => Some(to_event(payload)),
        Err(err) => {
            warn!(error = %err, "failed to serialise auth state");
            None
        }
    }
}
