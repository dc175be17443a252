use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;

use crate::{
    cli, error, info,
    listenbrainz::{Scrobbler, SubmitOutcome},
    success, utils, warning,
};

/// Drives submission cycles until the queue drains or the attempt bound is
/// hit. Scheduler delays (5s normal, 30s after an errored attempt, or the
/// configured submit delay if larger) apply between cycles.
pub async fn submit(max_attempts: Option<u32>) {
    let scrobbler = cli::open_scrobbler().await;

    if !scrobbler.authenticated().await {
        error!("Not authenticated. Please run scroblcli auth first.");
    }

    let pending = scrobbler.pending().await;
    if pending == 0 {
        info!("Queue is empty, nothing to submit.");
        return;
    }

    info!("Submitting {} queued listens...", pending);
    drain(&scrobbler, max_attempts).await;
}

/// The shared drain loop used by `submit`, `auth` and the `listen` mode's
/// shutdown path.
pub async fn drain(scrobbler: &Arc<Scrobbler>, max_attempts: Option<u32>) {
    let mut attempts: u32 = 0;

    loop {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Submitting listens...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        let outcome = scrobbler.submit_once().await;
        pb.finish_and_clear();

        if outcome == SubmitOutcome::Skipped {
            let snapshot = scrobbler.snapshot().await;
            if !snapshot.enabled {
                warning!("Scrobbling is disabled; listens stay queued.");
            } else if snapshot.offline {
                warning!("Offline mode is on; listens stay queued.");
            } else {
                warning!("Not authenticated; listens stay queued.");
            }
            return;
        }

        let left = scrobbler.pending().await;
        if left == 0 {
            success!("All listens submitted.");
            return;
        }

        attempts += 1;
        if max_attempts.is_some_and(|max| attempts >= max) {
            warning!("Giving up after {} attempts, {} listens left in the queue.", attempts, left);
            return;
        }

        let snapshot = scrobbler.snapshot().await;
        let delay = utils::submit_delay_secs(snapshot.submit_delay, snapshot.last_submit_errored);
        info!("{} listens left, retrying in {} seconds...", left, delay);
        sleep(Duration::from_secs(delay as u64)).await;
    }
}
