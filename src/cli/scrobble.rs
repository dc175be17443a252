use crate::{cli, error, info, success, types::TrackMetadata, warning};

/// Updates the tracked now-playing item and sends a `playing_now`
/// notification when online and authenticated.
pub async fn playing(track: TrackMetadata) {
    if !track.is_good() {
        warning!("Track needs at least an artist and a title; tracking locally only.");
    }

    let scrobbler = cli::open_scrobbler().await;
    match scrobbler.update_now_playing(track.clone()).await {
        Ok(()) => info!("Now playing: {} - {}", track.artist, track.title),
        Err(e) => error!("Failed to update now playing: {}", e),
    }
}

/// Enqueues the current item as listened and triggers submission when
/// online and authenticated. The listen is queued even offline.
pub async fn scrobble(track: TrackMetadata) {
    let scrobbler = cli::open_scrobbler().await;

    match scrobbler.scrobble(track.clone()).await {
        Ok(true) => {
            success!("Queued listen: {} - {}", track.artist, track.title);
        }
        Ok(false) => {
            warning!(
                "{} - {} does not match the tracked item; run scroblcli playing first.",
                track.artist,
                track.title
            );
            return;
        }
        Err(e) => error!("Failed to queue listen: {}", e),
    }

    let snapshot = scrobbler.snapshot().await;
    if snapshot.authenticated && !snapshot.offline {
        cli::drain(&scrobbler, Some(1)).await;
    } else {
        info!("{} listens queued for later submission.", snapshot.pending);
    }
}

/// Clears the tracked item, evaluating the derived-scrobble rule for
/// live/radio streams first.
pub async fn stop() {
    let scrobbler = cli::open_scrobbler().await;
    let before = scrobbler.pending().await;

    if let Err(e) = scrobbler.clear_playing().await {
        error!("Failed to clear playback state: {}", e);
    }

    let after = scrobbler.pending().await;
    if after > before {
        info!("Derived scrobble queued for the stopped stream.");
        let snapshot = scrobbler.snapshot().await;
        if snapshot.authenticated && !snapshot.offline {
            cli::drain(&scrobbler, Some(1)).await;
        }
    }
    info!("Playback state cleared.");
}
