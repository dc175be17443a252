use clap::Parser;
use serde_json::json;

use crate::{
    error, info,
    management::{GROUP_LISTENBRAINZ, GROUP_SCROBBLER, ScrobblerConfig, SettingsStore},
    success,
};

#[derive(Parser, Debug, Clone)]
pub struct SettingsOptions {
    /// Enable or disable scrobbling
    #[clap(long)]
    pub enabled: Option<bool>,

    /// Offline mode: queue listens without submitting
    #[clap(long)]
    pub offline: Option<bool>,

    /// Seconds to wait before submitting queued listens
    #[clap(long)]
    pub submit_delay: Option<i64>,

    /// Submit the album artist instead of the track artist
    #[clap(long)]
    pub prefer_albumartist: Option<bool>,
}

/// Shows the scrobbler toggles, applying any provided changes first.
pub async fn settings(opts: SettingsOptions) {
    let mut store = match SettingsStore::load(SettingsStore::default_path()).await {
        Ok(store) => store,
        Err(e) => error!("Failed to load settings: {}", e),
    };

    let mut changed = false;
    if let Some(enabled) = opts.enabled {
        store.set(GROUP_LISTENBRAINZ, "enabled", json!(enabled));
        changed = true;
    }
    if let Some(offline) = opts.offline {
        store.set(GROUP_SCROBBLER, "offline", json!(offline));
        changed = true;
    }
    if let Some(submit_delay) = opts.submit_delay {
        store.set(GROUP_SCROBBLER, "submit_delay", json!(submit_delay));
        changed = true;
    }
    if let Some(prefer_albumartist) = opts.prefer_albumartist {
        store.set(GROUP_SCROBBLER, "prefer_albumartist", json!(prefer_albumartist));
        changed = true;
    }

    if changed {
        if let Err(e) = store.persist().await {
            error!("Failed to save settings: {}", e);
        }
        success!("Settings updated.");
    }

    let config = ScrobblerConfig::from_store(&store);
    info!("enabled = {}", config.enabled);
    info!("offline = {}", config.offline);
    info!("submit_delay = {}", config.submit_delay);
    info!("prefer_albumartist = {}", config.prefer_albumartist);
}
