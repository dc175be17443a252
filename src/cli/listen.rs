use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{cli, info, types::PlayerEvent, warning};

/// Long-running mode for player integrations: consumes one JSON playback
/// event per stdin line (`playing`, `scrobble`, `stop`) and drives the
/// scrobbler's event pipeline, including the retry and token-refresh
/// timers. On end of input the tracked item is cleared and the queue
/// drained.
pub async fn listen() {
    let scrobbler = cli::open_scrobbler().await;
    scrobbler.load_session().await;

    info!("Reading playback events from stdin (one JSON object per line)...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let event: PlayerEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warning!("Ignoring malformed event: {}", e);
                continue;
            }
        };

        let result = match event {
            PlayerEvent::Playing { track } => scrobbler.update_now_playing(track).await,
            PlayerEvent::Scrobble { track } => scrobbler.scrobble(track).await.map(|_| ()),
            PlayerEvent::Stop => scrobbler.clear_playing().await,
        };
        if let Err(e) = result {
            warning!("Event handling failed: {}", e);
        }
    }

    if let Err(e) = scrobbler.clear_playing().await {
        warning!("Failed to clear playback state: {}", e);
    }

    let snapshot = scrobbler.snapshot().await;
    if snapshot.pending > 0 && snapshot.authenticated && !snapshot.offline {
        info!("Submitting {} queued listens before exit...", snapshot.pending);
        cli::drain(&scrobbler, None).await;
    }
}
