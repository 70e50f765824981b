//! Signed-in sessions and their change notifications.

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;
use uuid::Uuid;

/// Identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthUser {
    /// Login email.
    pub email: String,
    /// Name shown in the header.
    pub display_name: String,
}

struct Session {
    user: AuthUser,
    changes: watch::Sender<Option<AuthUser>>,
}

/// Registry of live sessions keyed by opaque token.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `user` and return its token.
    pub fn open(&self, user: AuthUser) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let (changes, _rx) = watch::channel(Some(user.clone()));
        self.sessions.insert(token.clone(), Session { user, changes });
        token
    }

    /// Close a session, notifying its watchers. Returns whether the token was live.
    pub fn close(&self, token: &str) -> bool {
        match self.sessions.remove(token) {
            Some((_, session)) => {
                session.changes.send_replace(None);
                true
            }
            None => false,
        }
    }

    /// User signed in under `token`, if any.
    pub fn user(&self, token: &str) -> Option<AuthUser> {
        self.sessions.get(token).map(|session| session.user.clone())
    }

    /// Watch the session behind `token`; `None` for unknown tokens.
    pub fn watch(&self, token: &str) -> Option<watch::Receiver<Option<AuthUser>>> {
        self.sessions
            .get(token)
            .map(|session| session.changes.subscribe())
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn umpire() -> AuthUser {
        AuthUser {
            email: "umpire@example.com".into(),
            display_name: "Umpire".into(),
        }
    }

    #[test]
    fn open_then_lookup() {
        let registry = SessionRegistry::new();
        let token = registry.open(umpire());
        assert_eq!(registry.user(&token), Some(umpire()));
        assert_eq!(registry.user("other"), None);
    }

    #[tokio::test]
    async fn close_notifies_watchers() {
        let registry = SessionRegistry::new();
        let token = registry.open(umpire());
        let mut rx = registry.watch(&token).unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(umpire()));

        assert!(registry.close(&token));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), None);
        assert!(registry.is_empty());
        assert!(!registry.close(&token));
    }
}
