use crate::{cli, info, utils};

/// Prints session state, toggles and queue depth.
pub async fn status() {
    let scrobbler = cli::open_scrobbler().await;
    let snapshot = scrobbler.snapshot().await;

    info!(
        "Session: {}",
        if snapshot.authenticated {
            "authenticated"
        } else {
            "logged out"
        }
    );
    info!(
        "Scrobbling: {}{}",
        if snapshot.enabled { "enabled" } else { "disabled" },
        if snapshot.offline { " (offline mode)" } else { "" }
    );
    info!("Submit delay: {} seconds", snapshot.submit_delay);
    info!(
        "Queue: {} pending listens{}",
        snapshot.pending,
        if snapshot.last_submit_errored {
            " (last submission errored)"
        } else {
            ""
        }
    );

    match snapshot.playing {
        Some(playing) => info!(
            "Playing: {} - {} (since {}{})",
            playing.metadata.artist,
            playing.metadata.title,
            utils::format_epoch(playing.started_at),
            if playing.scrobbled { ", scrobbled" } else { "" }
        ),
        None => info!("Playing: nothing tracked"),
    }
}
