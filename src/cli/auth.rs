use crate::{cli, error, info, success};

/// Runs the OAuth authorization flow and, on success, submits any listens
/// queued while logged out.
pub async fn auth() {
    let scrobbler = cli::open_scrobbler().await;

    info!("Waiting for authorization in your browser...");
    match scrobbler.authenticate().await {
        Ok(()) => {
            success!("Authentication successful!");
        }
        Err(e) => {
            error!("Authentication failed: {}", e);
        }
    }

    let pending = scrobbler.pending().await;
    if pending > 0 {
        info!("Submitting {} queued listens...", pending);
        cli::drain(&scrobbler, None).await;
    }
}
