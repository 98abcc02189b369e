//! Per-user search sessions and the in-memory store that owns them.
//!
//! A session records one user's in-progress search-to-download
//! interaction. The result list is frozen at creation (only the page
//! moves), one session exists per user, and a new search unconditionally
//! replaces whatever was there. Nothing survives a restart.

use crate::bot::pagination::total_pages;
use crate::provider::{MediaKind, SearchResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One user's active search interaction.
#[derive(Debug, Clone)]
pub struct SearchSession {
    /// Telegram user id of whoever issued the search
    pub owner: i64,
    /// The original query text
    pub query: String,
    /// Media kind the user asked for
    pub kind: MediaKind,
    /// Provider results in rank order; shared, never mutated
    pub results: Arc<[SearchResult]>,
    /// Currently displayed page, always within `0..total_pages`
    pub page: usize,
}

impl SearchSession {
    /// Build a session from a completed search, or `None` when the search
    /// produced nothing (no session is created for empty result sets).
    #[must_use]
    pub fn from_results(
        owner: i64,
        query: impl Into<String>,
        kind: MediaKind,
        results: Vec<SearchResult>,
    ) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        Some(Self {
            owner,
            query: query.into(),
            kind,
            results: results.into(),
            page: 0,
        })
    }

    /// Pages needed for this session's result list.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        total_pages(self.results.len())
    }
}

/// Process-wide user-id → session mapping. Injected wherever sessions are
/// needed; concurrent writes for the same user resolve last-write-wins.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<i64, SearchSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `session` for its owner, replacing any existing entry.
    pub async fn put(&self, session: SearchSession) {
        self.inner.write().await.insert(session.owner, session);
    }

    /// Snapshot of the user's session, if any. The clone is cheap: the
    /// result list is behind an `Arc`.
    pub async fn get(&self, user_id: i64) -> Option<SearchSession> {
        self.inner.read().await.get(&user_id).cloned()
    }

    /// Remove the user's session. Returns `true` when one existed.
    pub async fn remove(&self, user_id: i64) -> bool {
        self.inner.write().await.remove(&user_id).is_some()
    }

    /// Move the user's session to `page` and return the updated snapshot.
    /// Returns `None` when no session exists or the page is out of bounds
    /// for the session as it is *now* (the session may have been replaced
    /// since the button was rendered).
    pub async fn set_page(&self, user_id: i64, page: usize) -> Option<SearchSession> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(&user_id)?;
        if page >= session.total_pages() {
            return None;
        }
        session.page = page;
        Some(session.clone())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                id: format!("id{i}"),
                title: format!("title {i}"),
                duration_secs: 60,
                uploader: "up".to_string(),
                url: format!("https://example.com/{i}"),
            })
            .collect()
    }

    fn session(owner: i64, n: usize) -> SearchSession {
        SearchSession::from_results(owner, "query", MediaKind::Audio, results(n))
            .expect("non-empty results build a session")
    }

    #[test]
    fn empty_results_create_no_session() {
        assert!(SearchSession::from_results(1, "q", MediaKind::Video, vec![]).is_none());
    }

    #[tokio::test]
    async fn put_replaces_existing_session() {
        let store = SessionStore::new();
        store.put(session(7, 3)).await;
        store.put(session(7, 8)).await;

        let current = store.get(7).await.expect("session present");
        assert_eq!(current.results.len(), 8);
        assert_eq!(current.page, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn racing_searches_resolve_last_write_wins() {
        // Second search resolves first with 3 results, then the first
        // search resolves with 8: the last completion owns the session.
        let store = SessionStore::new();
        store.put(session(7, 3)).await;
        store.put(session(7, 8)).await;
        assert_eq!(store.get(7).await.expect("present").results.len(), 8);
    }

    #[tokio::test]
    async fn set_page_validates_bounds() {
        let store = SessionStore::new();
        store.put(session(1, 12)).await;

        let moved = store.set_page(1, 2).await.expect("page 2 of 3 is valid");
        assert_eq!(moved.page, 2);

        assert!(store.set_page(1, 3).await.is_none());
        // And the failed move left the session untouched
        assert_eq!(store.get(1).await.expect("present").page, 2);
    }

    #[tokio::test]
    async fn events_after_removal_find_nothing() {
        let store = SessionStore::new();
        store.put(session(5, 4)).await;
        assert!(store.remove(5).await);

        assert!(store.get(5).await.is_none());
        assert!(store.set_page(5, 0).await.is_none());
        assert!(!store.remove(5).await);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let store = SessionStore::new();
        store.put(session(1, 3)).await;
        store.put(session(2, 6)).await;

        store.set_page(2, 1).await.expect("valid move");
        assert_eq!(store.get(1).await.expect("present").page, 0);
        assert_eq!(store.len().await, 2);
    }
}
