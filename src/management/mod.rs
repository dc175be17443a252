mod cache;
mod session;
mod settings;

pub use cache::CacheError;
pub use cache::ScrobbleCache;
pub use session::SessionManager;
pub use settings::GROUP_LISTENBRAINZ;
pub use settings::GROUP_PLAYBACK;
pub use settings::GROUP_SCROBBLER;
pub use settings::ScrobblerConfig;
pub use settings::SettingsError;
pub use settings::SettingsStore;
