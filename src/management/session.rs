use std::time::Duration;

use serde_json::json;

use crate::{
    management::settings::{GROUP_LISTENBRAINZ, SettingsStore},
    types::Token,
    utils,
};

/// Owns the OAuth session fields and their persistence in the settings
/// store. Authentication state gates all submission and now-playing
/// activity.
pub struct SessionManager {
    access_token: String,
    token_type: String,
    refresh_token: String,
    expires_in: i64,
    login_time: i64,
}

impl SessionManager {
    /// Restores persisted session fields from the settings store.
    pub fn from_store(store: &SettingsStore) -> Self {
        Self {
            access_token: store.get_str(GROUP_LISTENBRAINZ, "access_token"),
            token_type: store.get_str(GROUP_LISTENBRAINZ, "token_type"),
            refresh_token: store.get_str(GROUP_LISTENBRAINZ, "refresh_token"),
            expires_in: store.get_i64(GROUP_LISTENBRAINZ, "expires_in", -1),
            login_time: store.get_i64(GROUP_LISTENBRAINZ, "login_time", 0),
        }
    }

    pub fn authenticated(&self) -> bool {
        !self.access_token.is_empty() && !self.token_type.is_empty()
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn login_time(&self) -> i64 {
        self.login_time
    }

    /// Replaces the session with freshly obtained token fields and writes
    /// them to the store. The caller persists the store.
    pub fn apply(&mut self, token: Token, store: &mut SettingsStore) {
        self.access_token = token.access_token;
        self.token_type = token.token_type;
        // The token endpoint may omit the refresh token on refresh grants,
        // in which case the held one stays valid.
        if !token.refresh_token.is_empty() {
            self.refresh_token = token.refresh_token;
        }
        self.expires_in = token.expires_in;
        self.login_time = token.login_time;

        store.set(GROUP_LISTENBRAINZ, "access_token", json!(self.access_token));
        store.set(GROUP_LISTENBRAINZ, "token_type", json!(self.token_type));
        store.set(GROUP_LISTENBRAINZ, "refresh_token", json!(self.refresh_token));
        store.set(GROUP_LISTENBRAINZ, "expires_in", json!(self.expires_in));
        store.set(GROUP_LISTENBRAINZ, "login_time", json!(self.login_time));
    }

    /// Clears all in-memory and persisted session fields. Used when the
    /// session is invalidated remotely or the user logs out.
    pub fn clear(&mut self, store: &mut SettingsStore) {
        self.access_token.clear();
        self.token_type.clear();
        self.refresh_token.clear();
        self.expires_in = -1;
        self.login_time = 0;

        store.remove(GROUP_LISTENBRAINZ, "access_token");
        store.remove(GROUP_LISTENBRAINZ, "token_type");
        store.remove(GROUP_LISTENBRAINZ, "refresh_token");
        store.remove(GROUP_LISTENBRAINZ, "expires_in");
        store.remove(GROUP_LISTENBRAINZ, "login_time");
    }

    /// How long until the refresh timer should fire, if a refresh token is
    /// held. Floored at 6 seconds for restored sessions already near or
    /// past expiry.
    pub fn refresh_interval(&self, now: i64) -> Option<Duration> {
        if self.refresh_token.is_empty() {
            return None;
        }
        let secs = utils::refresh_interval_secs(self.expires_in, self.login_time, now);
        Some(Duration::from_secs(secs as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn token() -> Token {
        Token {
            access_token: "acc".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: "ref".to_string(),
            expires_in: 3600,
            login_time: 1000,
        }
    }

    #[tokio::test]
    async fn apply_and_restore() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = SettingsStore::new(path.clone());

        let mut session = SessionManager::from_store(&store);
        assert!(!session.authenticated());

        session.apply(token(), &mut store);
        store.persist().await.unwrap();

        let store = SettingsStore::load(path).await.unwrap();
        let restored = SessionManager::from_store(&store);
        assert!(restored.authenticated());
        assert_eq!(restored.access_token(), "acc");
        assert_eq!(restored.refresh_token(), "ref");
    }

    #[test]
    fn refresh_grant_keeps_old_refresh_token() {
        let dir = tempdir().unwrap();
        let mut store = SettingsStore::new(dir.path().join("settings.json"));
        let mut session = SessionManager::from_store(&store);
        session.apply(token(), &mut store);

        let mut refreshed = token();
        refreshed.access_token = "acc2".to_string();
        refreshed.refresh_token = String::new();
        session.apply(refreshed, &mut store);

        assert_eq!(session.access_token(), "acc2");
        assert_eq!(session.refresh_token(), "ref");
    }

    #[test]
    fn clear_wipes_fields() {
        let dir = tempdir().unwrap();
        let mut store = SettingsStore::new(dir.path().join("settings.json"));
        let mut session = SessionManager::from_store(&store);
        session.apply(token(), &mut store);

        session.clear(&mut store);
        assert!(!session.authenticated());
        assert!(session.refresh_interval(0).is_none());
        assert!(store.get(GROUP_LISTENBRAINZ, "access_token").is_none());
    }

    #[test]
    fn refresh_interval_floors_at_six_seconds() {
        let dir = tempdir().unwrap();
        let mut store = SettingsStore::new(dir.path().join("settings.json"));
        let mut session = SessionManager::from_store(&store);
        let mut t = token();
        t.expires_in = 3600;
        t.login_time = 0;
        session.apply(t, &mut store);

        // Restored 3650 seconds after login: already past expiry.
        assert_eq!(session.refresh_interval(3650), Some(Duration::from_secs(6)));
        // Plenty of lifetime left.
        assert_eq!(session.refresh_interval(600), Some(Duration::from_secs(3000)));
    }
}
