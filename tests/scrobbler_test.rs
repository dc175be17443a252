use reqwest::StatusCode;
use scroblcli::listenbrainz::auth::token_reply;
use scroblcli::listenbrainz::payload::listen_entry;
use scroblcli::listenbrainz::response::{ReplyKind, classify};
use scroblcli::listenbrainz::{
    DERIVED_SCROBBLE_MIN_SECS, SCROBBLES_PER_REQUEST, Scrobbler, SubmitOutcome, assemble_batch,
    derived_scrobble,
};
use scroblcli::types::{ListenRecord, PlayerEvent, PlayingTrack, TrackMetadata};
use scroblcli::utils;

// Helper function to create test track metadata
fn create_test_track(artist: &str, title: &str) -> TrackMetadata {
    TrackMetadata {
        artist: artist.to_string(),
        title: title.to_string(),
        album: Some("Test Album".to_string()),
        album_artist: None,
        track: Some(3),
        duration_secs: Some(240),
        musicbrainz_artist_id: None,
        musicbrainz_album_id: None,
        musicbrainz_recording_id: None,
        musicbrainz_track_id: None,
        radio: false,
    }
}

// Helper function to create a queue record with flags
fn create_test_record(id: u64, sent: bool, error: bool) -> ListenRecord {
    ListenRecord {
        id,
        metadata: create_test_track("Artist", &format!("Track {}", id)),
        timestamp: 1_700_000_000 + id as i64,
        sent,
        error,
    }
}

#[test]
fn test_batch_cap() {
    // A queue with more than 10 unsent, non-error records produces a first
    // batch of exactly 10.
    let records: Vec<ListenRecord> = (1..=14).map(|i| create_test_record(i, false, false)).collect();
    let batch = assemble_batch(&records, SCROBBLES_PER_REQUEST);
    assert_eq!(batch.len(), 10);
    assert_eq!(batch, (1..=10).collect::<Vec<u64>>());
}

#[test]
fn test_batch_skips_sent_records() {
    // Records of an in-flight submission are never re-batched.
    let records = vec![
        create_test_record(1, true, false),
        create_test_record(2, false, false),
        create_test_record(3, true, false),
        create_test_record(4, false, false),
    ];
    let batch = assemble_batch(&records, SCROBBLES_PER_REQUEST);
    assert_eq!(batch, vec![2, 4]);
}

#[test]
fn test_batch_all_sent_is_empty() {
    // Submit while a full batch is in flight: empty batch, no-op.
    let records: Vec<ListenRecord> = (1..=5).map(|i| create_test_record(i, true, false)).collect();
    let batch = assemble_batch(&records, SCROBBLES_PER_REQUEST);
    assert!(batch.is_empty());
}

#[test]
fn test_error_record_stops_batch_assembly() {
    // [A(ok), B(ok), C(error)] yields [A, B] first: the flagged record is
    // kept out of mixed batches.
    let records = vec![
        create_test_record(1, false, false),
        create_test_record(2, false, false),
        create_test_record(3, false, true),
    ];
    let batch = assemble_batch(&records, SCROBBLES_PER_REQUEST);
    assert_eq!(batch, vec![1, 2]);
}

#[test]
fn test_leading_error_record_submitted_alone() {
    // A flagged record at the head of the queue goes out by itself so the
    // culprit can be identified.
    let records = vec![
        create_test_record(1, false, true),
        create_test_record(2, false, false),
        create_test_record(3, false, false),
    ];
    let batch = assemble_batch(&records, SCROBBLES_PER_REQUEST);
    assert_eq!(batch, vec![1]);
}

#[test]
fn test_derived_scrobble_after_threshold() {
    let mut metadata = create_test_track("Radio Artist", "Stream");
    metadata.radio = true;
    let playing = Some(PlayingTrack {
        metadata,
        scrobbled: false,
        started_at: 0,
    });

    // Cleared at T=45: synthesized listen with elapsed time as duration.
    let derived = derived_scrobble(&playing, 45).expect("derived scrobble expected");
    assert_eq!(derived.duration_secs, Some(45));

    // Cleared at T=10: nothing.
    assert!(derived_scrobble(&playing, 10).is_none());

    // Exactly at the threshold: nothing (strictly more than 30 seconds).
    assert!(derived_scrobble(&playing, DERIVED_SCROBBLE_MIN_SECS).is_none());
}

#[test]
fn test_derived_scrobble_requires_radio_and_unscrobbled() {
    let playing = Some(PlayingTrack {
        metadata: create_test_track("Artist", "Track"),
        scrobbled: false,
        started_at: 0,
    });
    // Not a radio-type item.
    assert!(derived_scrobble(&playing, 100).is_none());

    let mut metadata = create_test_track("Radio Artist", "Stream");
    metadata.radio = true;
    let playing = Some(PlayingTrack {
        metadata,
        scrobbled: true,
        started_at: 0,
    });
    // Already explicitly scrobbled.
    assert!(derived_scrobble(&playing, 100).is_none());

    assert!(derived_scrobble(&None, 100).is_none());
}

#[test]
fn test_derived_scrobble_clock_skew_floors_elapsed_at_zero() {
    let mut metadata = create_test_track("Radio Artist", "Stream");
    metadata.radio = true;
    let playing = Some(PlayingTrack {
        metadata,
        scrobbled: false,
        started_at: 1000,
    });
    // Tracked start in the future: elapsed floors at 0, no scrobble.
    assert!(derived_scrobble(&playing, 500).is_none());
}

#[test]
fn test_refresh_interval_floor() {
    // Restored session past its expiry arms the 6-second floor, never a
    // negative interval.
    assert_eq!(utils::refresh_interval_secs(3600, 0, 3650), 6);
    assert_eq!(utils::refresh_interval_secs(3600, 0, 600), 3000);
    assert_eq!(utils::refresh_interval_secs(-1, 0, 0), 6);
}

#[test]
fn test_submit_delay_tiers() {
    // Normal floor is 5 seconds, post-error floor 30; a larger configured
    // delay wins over both.
    assert_eq!(utils::submit_delay_secs(0, false), 5);
    assert_eq!(utils::submit_delay_secs(0, true), 30);
    assert_eq!(utils::submit_delay_secs(60, false), 60);
    assert_eq!(utils::submit_delay_secs(60, true), 60);
    assert_eq!(utils::submit_delay_secs(-5, false), 5);
}

#[test]
fn test_classify_success() {
    let reply = classify(StatusCode::OK, br#"{"status": "ok"}"#);
    assert_eq!(reply.kind, ReplyKind::Success);
    assert!(!reply.session_expired);
    assert_eq!(reply.json.unwrap()["status"], "ok");
}

#[test]
fn test_classify_api_error_shapes() {
    // {error, error_description} shape
    let reply = classify(
        StatusCode::BAD_REQUEST,
        br#"{"error": "invalid_listen", "error_description": "artist_name missing"}"#,
    );
    assert_eq!(reply.kind, ReplyKind::ApiError);
    assert_eq!(reply.error_description, "artist_name missing");

    // {code, error} shape
    let reply = classify(
        StatusCode::BAD_REQUEST,
        br#"{"code": 400, "error": "Listen is too large"}"#,
    );
    assert_eq!(reply.kind, ReplyKind::ApiError);
    assert_eq!(reply.error_description, "Listen is too large (400)");
}

#[test]
fn test_classify_server_error_without_api_body() {
    let reply = classify(StatusCode::BAD_GATEWAY, b"upstream down");
    assert_eq!(reply.kind, ReplyKind::ServerError);
    assert_eq!(reply.error_description, "Received HTTP code 502");
    assert!(!reply.session_expired);
}

#[test]
fn test_classify_auth_errors_invalidate_session() {
    // Session invalidation regardless of which operation triggered it.
    let reply = classify(StatusCode::UNAUTHORIZED, b"");
    assert!(reply.session_expired);

    let reply = classify(StatusCode::FORBIDDEN, br#"{"code": 403, "error": "forbidden"}"#);
    assert!(reply.session_expired);
    assert_eq!(reply.kind, ReplyKind::ApiError);
}

#[test]
fn test_token_rejection_marks_session_expired() {
    // A revoked grant at the token endpoint invalidates the session; the
    // caller clears stored credentials instead of retrying.
    let err = token_reply(
        StatusCode::UNAUTHORIZED,
        br#"{"error": "invalid_grant", "error_description": "revoked"}"#,
    )
    .unwrap_err();
    assert!(err.session_expired);
    assert_eq!(err.message, "revoked");

    // A malformed reply is an exchange failure, not a session loss.
    let err = token_reply(StatusCode::BAD_REQUEST, b"oops").unwrap_err();
    assert!(!err.session_expired);

    let json = token_reply(StatusCode::OK, br#"{"access_token": "acc"}"#).unwrap();
    assert_eq!(json["access_token"], "acc");
}

#[tokio::test]
async fn test_submit_skipped_when_logged_out() {
    let dir = tempfile::tempdir().unwrap();
    let scrobbler = Scrobbler::open_at(
        dir.path().join("settings.json"),
        dir.path().join("listens.json"),
    )
    .await
    .unwrap();

    // The full cycle (submit + reschedule) is a no-op without a session.
    assert_eq!(scrobbler.submit().await, SubmitOutcome::Skipped);
    assert_eq!(scrobbler.pending().await, 0);
}

#[test]
fn test_listen_entry_payload_fields() {
    let mut metadata = create_test_track("Artist", "Track");
    metadata.musicbrainz_artist_id = Some("mbid-a/mbid-b/mbid-a".to_string());
    metadata.musicbrainz_recording_id = Some("rec-1".to_string());

    let entry = listen_entry(&metadata, Some(1_700_000_000), false);
    assert_eq!(entry.listened_at, Some(1_700_000_000));
    assert_eq!(entry.track_metadata.artist_name, "Artist");
    assert_eq!(entry.track_metadata.track_name, "Track");
    assert_eq!(entry.track_metadata.release_name.as_deref(), Some("Test Album"));

    let info = &entry.track_metadata.additional_info;
    assert_eq!(info.duration_ms, Some(240_000));
    assert_eq!(info.tracknumber, Some(3));
    // Artist MBIDs are split and deduplicated.
    assert_eq!(
        info.artist_mbids.as_deref(),
        Some(["mbid-a".to_string(), "mbid-b".to_string()].as_slice())
    );
    assert_eq!(info.recording_mbid.as_deref(), Some("rec-1"));
    assert_eq!(info.media_player, env!("CARGO_PKG_NAME"));
}

#[test]
fn test_listen_entry_prefers_album_artist_when_asked() {
    let mut metadata = create_test_track("Artist", "Track");
    metadata.album_artist = Some("Album Artist".to_string());

    let entry = listen_entry(&metadata, None, true);
    assert_eq!(entry.track_metadata.artist_name, "Album Artist");
    // Now-playing entries carry no listened_at.
    assert_eq!(entry.listened_at, None);

    let entry = listen_entry(&metadata, None, false);
    assert_eq!(entry.track_metadata.artist_name, "Artist");
}

#[test]
fn test_listen_entry_serializes_without_empty_fields() {
    let metadata = TrackMetadata {
        artist: "A".to_string(),
        title: "T".to_string(),
        album: None,
        album_artist: None,
        track: None,
        duration_secs: None,
        musicbrainz_artist_id: None,
        musicbrainz_album_id: None,
        musicbrainz_recording_id: None,
        musicbrainz_track_id: None,
        radio: false,
    };

    let entry = listen_entry(&metadata, None, false);
    let json = serde_json::to_value(&entry).unwrap();
    assert!(json.get("listened_at").is_none());
    let track_metadata = &json["track_metadata"];
    assert!(track_metadata.get("release_name").is_none());
    assert!(track_metadata["additional_info"].get("duration_ms").is_none());
    assert!(track_metadata["additional_info"].get("artist_mbids").is_none());
}

#[test]
fn test_player_event_parsing() {
    let event: PlayerEvent =
        serde_json::from_str(r#"{"event":"playing","artist":"A","title":"T","radio":true}"#)
            .unwrap();
    match event {
        PlayerEvent::Playing { track } => {
            assert_eq!(track.artist, "A");
            assert!(track.radio);
        }
        _ => panic!("expected playing event"),
    }

    let event: PlayerEvent = serde_json::from_str(r#"{"event":"stop"}"#).unwrap();
    assert!(matches!(event, PlayerEvent::Stop));

    assert!(serde_json::from_str::<PlayerEvent>(r#"{"event":"seek"}"#).is_err());
}

#[test]
fn test_metadata_goodness() {
    assert!(create_test_track("Artist", "Track").is_good());
    assert!(!create_test_track("", "Track").is_good());
    assert!(!create_test_track("Artist", "").is_good());
}
