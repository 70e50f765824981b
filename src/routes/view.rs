use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, Uri},
    routing::get,
};

use crate::{
    dto::view::{PageView, ViewQuery},
    error::AppError,
    routes::auth::session_token,
    services::{auth_service, view_service},
    state::SharedState,
};

/// Page model endpoint consumed by the browser client.
pub fn router() -> Router<SharedState> {
    Router::new().route("/view", get(view))
}

/// Build the dashboard, a board (`?m=<id>`) or the signed-out chrome.
#[utoipa::path(
    get,
    path = "/view",
    tag = "view",
    params(ViewQuery),
    responses(
        (status = 200, description = "Page model", body = PageView),
        (status = 503, description = "Match store unavailable")
    )
)]
pub async fn view(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<ViewQuery>,
) -> Result<Json<PageView>, AppError> {
    let token = session_token(&headers, &uri);
    let user = auth_service::current_user(&state, token.as_deref());
    Ok(Json(
        view_service::page(&state, user, query.m.as_deref()).await?,
    ))
}
