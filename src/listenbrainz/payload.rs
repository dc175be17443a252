use crate::types::{AdditionalInfo, ListenEntry, TrackMetadata, TrackMetadataPayload};

/// Builds one payload entry for `submit-listens`.
///
/// `listened_at` is set for imports and omitted for `playing_now`
/// notifications. MusicBrainz identifiers are forwarded when present;
/// artist MBIDs are deduplicated.
pub fn listen_entry(
    metadata: &TrackMetadata,
    listened_at: Option<i64>,
    prefer_albumartist: bool,
) -> ListenEntry {
    let mut artist_mbids: Vec<String> = Vec::new();
    if let Some(mbid) = &metadata.musicbrainz_artist_id {
        for part in mbid.split('/') {
            if !part.is_empty() && !artist_mbids.iter().any(|m| m == part) {
                artist_mbids.push(part.to_string());
            }
        }
    }

    ListenEntry {
        listened_at,
        track_metadata: TrackMetadataPayload {
            artist_name: metadata.effective_artist(prefer_albumartist).to_string(),
            track_name: metadata.title.clone(),
            release_name: metadata.album.clone().filter(|a| !a.is_empty()),
            additional_info: AdditionalInfo {
                duration_ms: metadata.duration_secs.map(|s| s * 1000),
                tracknumber: metadata.track.filter(|t| *t > 0),
                media_player: env!("CARGO_PKG_NAME").to_string(),
                media_player_version: env!("CARGO_PKG_VERSION").to_string(),
                submission_client: env!("CARGO_PKG_NAME").to_string(),
                submission_client_version: env!("CARGO_PKG_VERSION").to_string(),
                artist_mbids: if artist_mbids.is_empty() {
                    None
                } else {
                    Some(artist_mbids)
                },
                release_mbid: metadata.musicbrainz_album_id.clone(),
                recording_mbid: metadata.musicbrainz_recording_id.clone(),
                track_mbid: metadata.musicbrainz_track_id.clone(),
            },
        },
    }
}
