use crate::{
    dao::match_store::is_match_id,
    dto::view::{APP_TITLE, BoardView, Chrome, DashboardView, NavLink, PageContent, PageView},
    error::ServiceError,
    services::match_service,
    state::{SharedState, auth::AuthUser},
};

/// Build the page for `user`, selecting the board of `match_id` or the dashboard.
///
/// Signed-out callers only get the chrome. A blank `match_id` counts as absent.
pub async fn page(
    state: &SharedState,
    user: Option<AuthUser>,
    match_id: Option<&str>,
) -> Result<PageView, ServiceError> {
    let signed_in = user.is_some();
    let chrome = chrome(user);
    if !signed_in {
        return Ok(PageView {
            chrome,
            content: None,
        });
    }

    let content = match match_id.map(str::trim).filter(|id| !id.is_empty()) {
        None => PageContent::Dashboard(DashboardView {
            matches: match_service::list(state).await?,
            create: NavLink::new("New match", "POST", "/matches"),
        }),
        Some(match_id) => {
            let store = state.require_match_store().await?;
            let snapshot = if is_match_id(match_id) {
                store.find_match(match_id.to_owned()).await?
            } else {
                None
            };
            PageContent::Board(BoardView::new(
                match_id.to_owned(),
                snapshot.as_ref().map(|entity| &entity.document),
            ))
        }
    };

    Ok(PageView {
        chrome,
        content: Some(content),
    })
}

fn chrome(user: Option<AuthUser>) -> Chrome {
    let navigation = if user.is_some() {
        vec![
            NavLink::new("Matches", "GET", "/view"),
            NavLink::new("Sign out", "POST", "/auth/logout"),
        ]
    } else {
        vec![NavLink::new("Sign in", "POST", "/auth/login")]
    };

    Chrome {
        title: APP_TITLE.to_string(),
        user,
        navigation,
    }
}
