use std::{collections::BTreeMap, io::Error, path::PathBuf};

use serde_json::Value;

pub const GROUP_LISTENBRAINZ: &str = "listenbrainz";
pub const GROUP_SCROBBLER: &str = "scrobbler";
pub const GROUP_PLAYBACK: &str = "playback";

#[derive(Debug)]
pub enum SettingsError {
    IoError(Error),
    SerdeError(serde_json::Error),
}

impl From<Error> for SettingsError {
    fn from(err: Error) -> Self {
        SettingsError::IoError(err)
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::IoError(e) => write!(f, "io error: {}", e),
            SettingsError::SerdeError(e) => write!(f, "serde error: {}", e),
        }
    }
}

/// Group-scoped key/value settings persisted as one JSON file.
///
/// Holds feature toggles, the OAuth session fields and the tracked playback
/// state. The whole file is rewritten on `persist`.
pub struct SettingsStore {
    path: PathBuf,
    groups: BTreeMap<String, BTreeMap<String, Value>>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            groups: BTreeMap::new(),
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("scroblcli/settings.json");
        path
    }

    /// Loads the store from disk; a missing file yields defaults.
    pub async fn load(path: PathBuf) -> Result<Self, SettingsError> {
        let groups = match async_fs::read_to_string(&path).await {
            Ok(json) => serde_json::from_str(&json).map_err(SettingsError::SerdeError)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(SettingsError::IoError(e)),
        };
        Ok(Self { path, groups })
    }

    pub async fn persist(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(SettingsError::IoError)?;
        }

        let json =
            serde_json::to_string_pretty(&self.groups).map_err(SettingsError::SerdeError)?;
        async_fs::write(&self.path, json)
            .await
            .map_err(SettingsError::IoError)
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&Value> {
        self.groups.get(group).and_then(|g| g.get(key))
    }

    pub fn get_bool(&self, group: &str, key: &str, default: bool) -> bool {
        self.get(group, key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn get_i64(&self, group: &str, key: &str, default: i64) -> i64 {
        self.get(group, key).and_then(Value::as_i64).unwrap_or(default)
    }

    pub fn get_str(&self, group: &str, key: &str) -> String {
        self.get(group, key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn set(&mut self, group: &str, key: &str, value: Value) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn remove(&mut self, group: &str, key: &str) {
        if let Some(g) = self.groups.get_mut(group) {
            g.remove(key);
        }
    }
}

/// Snapshot of the scrobbler toggles, read at construction and refreshed by
/// an explicit reload rather than read ad hoc.
#[derive(Debug, Clone)]
pub struct ScrobblerConfig {
    pub enabled: bool,
    pub offline: bool,
    pub submit_delay: i64,
    pub prefer_albumartist: bool,
}

impl ScrobblerConfig {
    pub fn from_store(store: &SettingsStore) -> Self {
        Self {
            enabled: store.get_bool(GROUP_LISTENBRAINZ, "enabled", true),
            offline: store.get_bool(GROUP_SCROBBLER, "offline", false),
            submit_delay: store.get_i64(GROUP_SCROBBLER, "submit_delay", 0),
            prefer_albumartist: store.get_bool(GROUP_SCROBBLER, "prefer_albumartist", false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn groups_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut store = SettingsStore::new(path.clone());
        store.set(GROUP_LISTENBRAINZ, "enabled", json!(true));
        store.set(GROUP_SCROBBLER, "submit_delay", json!(15));
        store.set(GROUP_LISTENBRAINZ, "access_token", json!("tok"));
        store.persist().await.unwrap();

        let reloaded = SettingsStore::load(path).await.unwrap();
        assert!(reloaded.get_bool(GROUP_LISTENBRAINZ, "enabled", false));
        assert_eq!(reloaded.get_i64(GROUP_SCROBBLER, "submit_delay", 0), 15);
        assert_eq!(reloaded.get_str(GROUP_LISTENBRAINZ, "access_token"), "tok");
        // Key scoping: same key name in a different group is absent.
        assert_eq!(reloaded.get_str(GROUP_SCROBBLER, "access_token"), "");
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("none.json")).await.unwrap();
        let config = ScrobblerConfig::from_store(&store);
        assert!(config.enabled);
        assert!(!config.offline);
        assert_eq!(config.submit_delay, 0);
    }

    #[tokio::test]
    async fn remove_deletes_key() {
        let dir = tempdir().unwrap();
        let mut store = SettingsStore::new(dir.path().join("settings.json"));
        store.set(GROUP_LISTENBRAINZ, "refresh_token", json!("r"));
        store.remove(GROUP_LISTENBRAINZ, "refresh_token");
        assert!(store.get(GROUP_LISTENBRAINZ, "refresh_token").is_none());
    }
}
