use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// OAuth session fields as persisted in the settings store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub login_time: i64,
}

/// Result of the local OAuth redirect: either an authorization code or an
/// error reported by the provider (e.g. the user denied access).
#[derive(Debug, Clone)]
pub enum AuthCallback {
    Code(String),
    Error(String),
}

/// Track identity fields for a listen. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub artist: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_artist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_album_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_recording_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_track_id: Option<String>,
    /// Live/radio-type source without natural track-end events.
    #[serde(default)]
    pub radio: bool,
}

impl TrackMetadata {
    /// A listen is only worth submitting when it at least identifies the
    /// track by artist and title.
    pub fn is_good(&self) -> bool {
        !self.artist.is_empty() && !self.title.is_empty()
    }

    /// The artist name to submit, honoring the album-artist preference.
    pub fn effective_artist(&self, prefer_albumartist: bool) -> &str {
        if prefer_albumartist {
            if let Some(album_artist) = &self.album_artist {
                if !album_artist.is_empty() {
                    return album_artist;
                }
            }
        }
        &self.artist
    }
}

/// One persisted queue entry.
///
/// `sent` is an in-memory flag only: it marks records included in an
/// in-flight submission so a concurrent submit cannot batch them again. An
/// in-flight marker cannot survive a restart, so it is not serialized and a
/// reloaded queue is entirely retryable. `error` persists so that error
/// isolation survives restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenRecord {
    pub id: u64,
    pub metadata: TrackMetadata,
    /// Epoch seconds marking when playback was considered listened.
    pub timestamp: i64,
    #[serde(skip)]
    pub sent: bool,
    #[serde(default)]
    pub error: bool,
}

/// The currently tracked playback item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayingTrack {
    pub metadata: TrackMetadata,
    pub scrobbled: bool,
    /// Epoch seconds when playback of this item started.
    pub started_at: i64,
}

/// Playback events consumed by the `listen` stdin mode, one JSON object per
/// line, e.g. `{"event":"playing","artist":"...","title":"..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    Playing {
        #[serde(flatten)]
        track: TrackMetadata,
    },
    Scrobble {
        #[serde(flatten)]
        track: TrackMetadata,
    },
    Stop,
}

/// Request body for `POST /1/submit-listens`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitListens {
    pub listen_type: &'static str,
    pub payload: Vec<ListenEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListenEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listened_at: Option<i64>,
    pub track_metadata: TrackMetadataPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackMetadataPayload {
    pub artist_name: String,
    pub track_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,
    pub additional_info: AdditionalInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdditionalInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracknumber: Option<u32>,
    pub media_player: String,
    pub media_player_version: String,
    pub submission_client: String,
    pub submission_client_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_mbids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_mbid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_mbid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_mbid: Option<String>,
}

/// Row shape for `scroblcli queue list`.
#[derive(Tabled)]
pub struct QueueTableRow {
    pub id: u64,
    pub listened_at: String,
    pub artist: String,
    pub title: String,
    pub flags: String,
}
