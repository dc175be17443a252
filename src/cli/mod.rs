//! # CLI Module
//!
//! This module provides the command-line interface layer for scroblcli, a
//! ListenBrainz scrobbler with a durable offline queue. It implements all
//! user-facing commands and coordinates between the scrobbler core, the
//! persistence managers and user interaction.
//!
//! ## Command Categories
//!
//! ### Authentication
//!
//! - [`auth`] - Runs the MusicBrainz OAuth authorization-code flow and
//!   drains the queue on success
//!
//! ### Playback tracking
//!
//! - [`playing`] - Updates the tracked now-playing item and notifies the API
//! - [`scrobble`] - Enqueues the current item as listened
//! - [`stop`] - Clears the tracked item (evaluating the derived-scrobble rule)
//! - [`listen`] - Long-running mode consuming JSON playback events on stdin
//!
//! ### Queue operations
//!
//! - [`submit`] - Drives submission cycles until the queue drains
//! - [`list_queue`] / [`clear_queue`] - Inspects or empties the durable queue
//!
//! ### Information & configuration
//!
//! - [`status`] - Session, toggles and pending count
//! - [`settings`] - Shows or updates the scrobbler toggles
//!
//! ## Error Handling Philosophy
//!
//! CLI functions terminate via the `error!` macro on unrecoverable failures
//! (missing configuration, broken cache files) and otherwise report through
//! `info!`/`warning!`/`success!`. Submission failures are never fatal: the
//! queue persists across restarts and failures, so delivery resumes once
//! connectivity and authentication are restored.

mod auth;
mod listen;
mod queue;
mod scrobble;
mod settings;
mod status;
mod submit;

pub use auth::auth;
pub use listen::listen;
pub use queue::clear_queue;
pub use queue::list_queue;
pub use scrobble::playing;
pub use scrobble::scrobble;
pub use scrobble::stop;
pub use settings::settings;
pub use settings::SettingsOptions;
pub use status::status;
pub use submit::drain;
pub use submit::submit;

use std::sync::Arc;

use crate::{error, listenbrainz::Scrobbler};

/// Opens the scrobbler against the default data paths, terminating on
/// unrecoverable persistence errors.
pub(crate) async fn open_scrobbler() -> Arc<Scrobbler> {
    match Scrobbler::open().await {
        Ok(scrobbler) => scrobbler,
        Err(e) => error!("Failed to open scrobbler state: {}", e),
    }
}
