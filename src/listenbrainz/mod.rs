//! # ListenBrainz Scrobbler Core
//!
//! The submission pipeline: qualifying plays are appended to the durable
//! queue, batched (up to [`SCROBBLES_PER_REQUEST`] per request), submitted
//! to `POST /1/submit-listens` and reconciled against the queue based on the
//! reply classification. Delivery is at-least-once: a record leaves the
//! queue only on confirmed success or an explicit single-item rejection.
//!
//! ## Control flow
//!
//! Play tracking observes playback events and enqueues qualifying listens.
//! The retry scheduler ([`Scrobbler::start_submit`]) decides when the next
//! submission attempt runs: immediately on the initial trigger when no delay
//! is configured and the previous attempt succeeded, otherwise via a
//! single-shot timer of `max(submit_delay, 30s after an error, else 5s)`.
//! Every submit cycle ends by re-invoking the scheduler, so the queue is
//! retried indefinitely until it drains.
//!
//! ## Concurrency
//!
//! All state lives behind one async mutex; suspension happens only at
//! network-request boundaries. Single-flight is enforced twice: the
//! [`SubmitState`] machine makes a second `submit` a no-op while a batch is
//! in flight, and the per-record `sent` flag keeps records of an outstanding
//! request out of any newly assembled batch.

pub mod auth;
pub mod payload;
pub mod response;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use reqwest::{Client, header::AUTHORIZATION};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    config, info,
    management::{
        GROUP_PLAYBACK, ScrobbleCache, ScrobblerConfig, SessionManager, SettingsStore,
    },
    server::start_api_server,
    types::{
        AuthCallback, ListenRecord, PlayingTrack, SubmitListens, TrackMetadata,
    },
    utils, warning,
};

use response::ReplyKind;

/// Maximum number of listens carried by one submission request.
pub const SCROBBLES_PER_REQUEST: usize = 10;

/// Minimum tracked playtime before a never-scrobbled live/radio item earns a
/// derived scrobble on replacement.
pub const DERIVED_SCROBBLE_MIN_SECS: i64 = 30;

/// Single-flight state of the batch submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

/// Result of one submit cycle, for callers driving cycles manually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Preconditions not met: disabled, unauthenticated or offline.
    Skipped,
    /// Empty batch: nothing eligible, or a batch is already in flight.
    Nothing,
    /// The batch was accepted; count of flushed listens.
    Submitted(usize),
    /// The attempt failed; the queue still holds retryable records.
    Failed(String),
}

/// Read-only snapshot for the status command.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub authenticated: bool,
    pub enabled: bool,
    pub offline: bool,
    pub submit_delay: i64,
    pub pending: usize,
    pub last_submit_errored: bool,
    pub playing: Option<PlayingTrack>,
}

struct Inner {
    config: ScrobblerConfig,
    settings: SettingsStore,
    session: SessionManager,
    cache: ScrobbleCache,
    playing: Option<PlayingTrack>,
    submit_state: SubmitState,
    submit_error: bool,
    submit_timer: Option<JoinHandle<()>>,
    refresh_timer: Option<JoinHandle<()>>,
}

/// The scrobbler: durable queue, batch submitter, retry scheduler, session
/// manager and play tracking behind one handle.
pub struct Scrobbler {
    http: Client,
    inner: Mutex<Inner>,
}

impl Scrobbler {
    /// Opens the scrobbler against the default data-directory paths.
    pub async fn open() -> crate::Res<Arc<Self>> {
        Self::open_at(SettingsStore::default_path(), ScrobbleCache::default_path()).await
    }

    pub async fn open_at(
        settings_path: std::path::PathBuf,
        cache_path: std::path::PathBuf,
    ) -> crate::Res<Arc<Self>> {
        let settings = SettingsStore::load(settings_path)
            .await
            .map_err(|e| e.to_string())?;
        let cache = ScrobbleCache::load(cache_path)
            .await
            .map_err(|e| e.to_string())?;
        let config = ScrobblerConfig::from_store(&settings);
        let session = SessionManager::from_store(&settings);
        let playing = settings
            .get(GROUP_PLAYBACK, "current")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Ok(Arc::new(Self {
            http: Client::new(),
            inner: Mutex::new(Inner {
                config,
                settings,
                session,
                cache,
                playing,
                submit_state: SubmitState::Idle,
                submit_error: false,
                submit_timer: None,
                refresh_timer: None,
            }),
        }))
    }

    /// Re-reads the configuration snapshot from the settings store.
    pub async fn reload_settings(&self) {
        let mut inner = self.inner.lock().await;
        inner.config = ScrobblerConfig::from_store(&inner.settings);
    }

    /// Startup path: arms the refresh timer for a restored session and
    /// schedules an initial submission if the queue is non-empty.
    pub async fn load_session(self: &Arc<Self>) {
        let interval = {
            let inner = self.inner.lock().await;
            inner.session.refresh_interval(utils::now_epoch())
        };
        if let Some(interval) = interval {
            self.arm_refresh_timer(interval).await;
        }
        self.start_submit(true).await;
    }

    pub async fn authenticated(&self) -> bool {
        self.inner.lock().await.session.authenticated()
    }

    pub async fn pending(&self) -> usize {
        self.inner.lock().await.cache.count()
    }

    pub async fn queue(&self) -> Vec<ListenRecord> {
        self.inner.lock().await.cache.list().to_vec()
    }

    pub async fn clear_queue(&self) -> crate::Res<()> {
        let mut inner = self.inner.lock().await;
        inner.cache.clear().await.map_err(|e| e.to_string())?;
        Ok(())
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock().await;
        StatusSnapshot {
            authenticated: inner.session.authenticated(),
            enabled: inner.config.enabled,
            offline: inner.config.offline,
            submit_delay: inner.config.submit_delay,
            pending: inner.cache.count(),
            last_submit_errored: inner.submit_error,
            playing: inner.playing.clone(),
        }
    }

    /// Runs the OAuth authorization-code flow: starts the local callback
    /// server, opens the authorization URL, waits for the redirect and
    /// exchanges the code. On success the session is persisted, the refresh
    /// timer armed and the initial submit path triggered.
    pub async fn authenticate(self: &Arc<Self>) -> Result<(), String> {
        let shared_state: Arc<Mutex<Option<AuthCallback>>> = Arc::new(Mutex::new(None));
        let server_state = Arc::clone(&shared_state);
        tokio::spawn(async move {
            start_api_server(server_state).await;
        });

        let auth_url = auth::authorize_url();
        auth::open_authorize_url(&auth_url);

        let token = match auth::wait_for_callback(shared_state).await {
            Some(AuthCallback::Code(code)) => match auth::exchange_code(&code).await {
                Ok(token) => token,
                Err(e) => {
                    // An auth-denied exchange invalidates whatever session
                    // was held before this attempt.
                    if e.session_expired {
                        self.logout().await;
                    }
                    return Err(e.message);
                }
            },
            Some(AuthCallback::Error(e)) => return Err(e),
            None => return Err("Authentication failed or timed out.".to_string()),
        };

        let expires_in = token.expires_in;
        {
            let mut inner = self.inner.lock().await;
            if let Some(timer) = inner.refresh_timer.take() {
                timer.abort();
            }
            let Inner {
                session, settings, ..
            } = &mut *inner;
            session.apply(token, settings);
            settings.persist().await.map_err(|e| e.to_string())?;
        }
        if expires_in > 0 {
            self.arm_refresh_timer(Duration::from_secs(expires_in as u64))
                .await;
        }

        self.start_submit(true).await;
        Ok(())
    }

    /// Refresh-timer callback: repeats the token exchange with the held
    /// refresh token. No-op without one or when the service is disabled.
    /// Boxed for the same reason as [`Scrobbler::submit`]: the refresh timer
    /// it arms re-enters this method.
    pub fn request_new_access_token(self: &Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let refresh_token = {
                let inner = self.inner.lock().await;
                if !inner.config.enabled {
                    return;
                }
                inner.session.refresh_token().to_string()
            };
            if refresh_token.is_empty() {
                return;
            }

            match auth::exchange_refresh_token(&refresh_token).await {
                Ok(token) => {
                    let expires_in = token.expires_in;
                    {
                        let mut inner = self.inner.lock().await;
                        let Inner {
                            session, settings, ..
                        } = &mut *inner;
                        session.apply(token, settings);
                        if let Err(e) = settings.persist().await {
                            warning!("Failed to persist refreshed session: {}", e);
                        }
                    }
                    if expires_in > 0 {
                        self.arm_refresh_timer(Duration::from_secs(expires_in as u64))
                            .await;
                    }
                    self.start_submit(true).await;
                }
                Err(e) if e.session_expired => {
                    warning!("Token refresh rejected: {}", e);
                    let mut inner = self.inner.lock().await;
                    Self::invalidate_session(&mut inner).await;
                }
                Err(e) => {
                    warning!("Token refresh failed: {}", e);
                }
            }
        })
    }

    /// Clears all in-memory and persisted session fields and disarms the
    /// refresh timer.
    pub async fn logout(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.refresh_timer.take() {
            timer.abort();
        }
        let Inner {
            session, settings, ..
        } = &mut *inner;
        session.clear(settings);
        if let Err(e) = settings.persist().await {
            warning!("Failed to persist session logout: {}", e);
        }
    }

    /// Replaces the tracked playback item, evaluating the previous one for a
    /// derived scrobble first. The `playing_now` notification is skipped
    /// when metadata is incomplete, the session is unauthenticated or the
    /// user is offline; local tracking state is updated regardless.
    pub async fn update_now_playing(self: &Arc<Self>, track: TrackMetadata) -> crate::Res<()> {
        let now = utils::now_epoch();
        let (notify, trigger_submit) = {
            let mut inner = self.inner.lock().await;
            let trigger_submit = self.enqueue_derived(&mut inner, now).await?;

            inner.playing = Some(PlayingTrack {
                metadata: track.clone(),
                scrobbled: false,
                started_at: now,
            });
            Self::store_playing(&mut inner).await?;

            let notify = track.is_good()
                && inner.session.authenticated()
                && !inner.config.offline;
            let notify = notify.then(|| {
                (
                    inner.session.access_token().to_string(),
                    inner.config.prefer_albumartist,
                )
            });
            (notify, trigger_submit)
        };

        if let Some((token, prefer_albumartist)) = notify {
            let body = SubmitListens {
                listen_type: "playing_now",
                payload: vec![payload::listen_entry(&track, None, prefer_albumartist)],
            };
            match self.post_listens(&token, &body).await {
                Ok(reply) => {
                    if reply.session_expired {
                        self.logout().await;
                    }
                    if reply.kind != ReplyKind::Success {
                        warning!("Now playing update failed: {}", reply.error_description);
                    } else {
                        let status = reply
                            .json
                            .as_ref()
                            .and_then(|j| j["status"].as_str())
                            .unwrap_or_default()
                            .to_string();
                        if !status.eq_ignore_ascii_case("ok") {
                            warning!("Received {} status for now playing.", status);
                        }
                    }
                }
                Err(e) => warning!("Now playing update failed: {}", e),
            }
        }

        if trigger_submit {
            self.start_submit(true).await;
        }
        Ok(())
    }

    /// Enqueues the current item as listened. Only accepted when it matches
    /// the tracked item and carries adequate metadata. The listen is
    /// appended even offline; submission is triggered only when online and
    /// authenticated.
    pub async fn scrobble(self: &Arc<Self>, track: TrackMetadata) -> crate::Res<bool> {
        let trigger_submit = {
            let mut inner = self.inner.lock().await;
            let Some(playing) = inner.playing.clone() else {
                return Ok(false);
            };
            if !same_item(&track, &playing.metadata) || !track.is_good() {
                return Ok(false);
            }

            if let Some(playing) = inner.playing.as_mut() {
                playing.scrobbled = true;
            }
            let timestamp = playing.started_at;
            inner
                .cache
                .add(track, timestamp)
                .await
                .map_err(|e| e.to_string())?;
            Self::store_playing(&mut inner).await?;

            !inner.config.offline && inner.session.authenticated()
        };

        if trigger_submit {
            self.start_submit(true).await;
        }
        Ok(true)
    }

    /// Stop event: evaluates the previous item for a derived scrobble, then
    /// resets tracking state to empty.
    pub async fn clear_playing(self: &Arc<Self>) -> crate::Res<()> {
        let now = utils::now_epoch();
        let trigger_submit = {
            let mut inner = self.inner.lock().await;
            let trigger_submit = self.enqueue_derived(&mut inner, now).await?;
            inner.playing = None;
            Self::store_playing(&mut inner).await?;
            trigger_submit
        };

        if trigger_submit {
            self.start_submit(true).await;
        }
        Ok(())
    }

    /// Retry/backoff scheduler. Single-shot semantics: an already-armed
    /// timer is left alone, except on the immediate path which cancels it.
    pub async fn start_submit(self: &Arc<Self>, initial: bool) {
        let mut inner = self.inner.lock().await;
        if inner.submit_state != SubmitState::Idle || inner.cache.count() == 0 {
            return;
        }

        if initial && inner.config.submit_delay <= 0 && !inner.submit_error {
            if let Some(timer) = inner.submit_timer.take() {
                timer.abort();
            }
            let scrobbler = Arc::clone(self);
            inner.submit_timer = Some(tokio::spawn(async move {
                scrobbler.submit().await;
            }));
        } else if !timer_armed(&inner.submit_timer) {
            let delay = utils::submit_delay_secs(inner.config.submit_delay, inner.submit_error);
            let scrobbler = Arc::clone(self);
            inner.submit_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(delay as u64)).await;
                scrobbler.submit().await;
            }));
        }
    }

    /// One submit cycle followed by rescheduling if unsent records remain.
    ///
    /// Boxed: the scheduler's spawned timer tasks re-enter this method, so
    /// the call cycle must not appear in an opaque future type.
    pub fn submit(self: &Arc<Self>) -> Pin<Box<dyn Future<Output = SubmitOutcome> + Send + '_>> {
        Box::pin(async move {
            let outcome = self.submit_once().await;
            self.start_submit(false).await;
            outcome
        })
    }

    /// One submit cycle without rescheduling: assembles a batch, marks it
    /// sent, issues the request and reconciles the outcome into the queue.
    pub async fn submit_once(self: &Arc<Self>) -> SubmitOutcome {
        let (ids, body, token, single) = {
            let mut inner = self.inner.lock().await;
            // Vacate the armed-timer slot: either the timer just fired into
            // this call, or a direct call supersedes it. A stale sleeper
            // firing later lands in the no-op guards.
            inner.submit_timer = None;
            if !inner.config.enabled || !inner.session.authenticated() || inner.config.offline {
                return SubmitOutcome::Skipped;
            }
            if inner.submit_state == SubmitState::Submitting {
                return SubmitOutcome::Nothing;
            }

            let ids = assemble_batch(inner.cache.list(), SCROBBLES_PER_REQUEST);
            if ids.is_empty() {
                return SubmitOutcome::Nothing;
            }

            let prefer_albumartist = inner.config.prefer_albumartist;
            let entries: Vec<_> = inner
                .cache
                .list()
                .iter()
                .filter(|r| ids.contains(&r.id))
                .map(|r| payload::listen_entry(&r.metadata, Some(r.timestamp), prefer_albumartist))
                .collect();
            let single = inner
                .cache
                .list()
                .iter()
                .find(|r| ids.contains(&r.id))
                .map(|r| {
                    format!(
                        "{} - {}",
                        r.metadata.effective_artist(prefer_albumartist),
                        r.metadata.title
                    )
                })
                .unwrap_or_default();

            // Marked before the request goes out so a concurrent submit
            // cannot re-batch these records.
            inner.cache.mark_sent(&ids);
            inner.submit_state = SubmitState::Submitting;

            let body = SubmitListens {
                listen_type: "import",
                payload: entries,
            };
            (ids, body, inner.session.access_token().to_string(), single)
        };

        let result = self.post_listens(&token, &body).await;

        let mut inner = self.inner.lock().await;
        inner.submit_state = SubmitState::Idle;

        let outcome = match result {
            Ok(reply) => match reply.kind {
                ReplyKind::Success => {
                    if let Err(e) = inner.cache.flush(&ids).await {
                        warning!("Failed to persist queue: {}", e);
                    }
                    inner.submit_error = false;
                    SubmitOutcome::Submitted(ids.len())
                }
                ReplyKind::ApiError => {
                    inner.submit_error = true;
                    if reply.session_expired {
                        Self::invalidate_session(&mut inner).await;
                    }
                    if ids.len() == 1 {
                        // One rejected item: the server has judged this
                        // specific listen bad, do not retry it.
                        warning!(
                            "Unable to scrobble {} because of error: {}",
                            single,
                            reply.error_description
                        );
                        if let Err(e) = inner.cache.flush(&ids).await {
                            warning!("Failed to persist queue: {}", e);
                        }
                        SubmitOutcome::Submitted(0)
                    } else {
                        // Batch-level rejection without per-item blame: flag
                        // the batch so the next assembly isolates the
                        // culprit one record at a time.
                        warning!("Scrobble submission failed: {}", reply.error_description);
                        if let Err(e) = inner.cache.set_error(&ids).await {
                            warning!("Failed to persist queue: {}", e);
                        }
                        inner.cache.clear_sent(&ids);
                        SubmitOutcome::Failed(reply.error_description)
                    }
                }
                ReplyKind::ServerError => {
                    inner.submit_error = true;
                    if reply.session_expired {
                        Self::invalidate_session(&mut inner).await;
                    }
                    warning!("Scrobble submission failed: {}", reply.error_description);
                    inner.cache.clear_sent(&ids);
                    SubmitOutcome::Failed(reply.error_description)
                }
            },
            Err(transport) => {
                inner.submit_error = true;
                warning!("Scrobble submission failed: {}", transport);
                inner.cache.clear_sent(&ids);
                SubmitOutcome::Failed(transport)
            }
        };

        outcome
    }

    async fn post_listens(
        &self,
        token: &str,
        body: &SubmitListens,
    ) -> Result<response::Reply, String> {
        let url = format!("{}/1/submit-listens", config::api_url());
        let res = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Token {}", token))
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| e.to_string())?;
        Ok(response::classify(status, &bytes))
    }

    async fn invalidate_session(inner: &mut Inner) {
        if let Some(timer) = inner.refresh_timer.take() {
            timer.abort();
        }
        let Inner {
            session, settings, ..
        } = &mut *inner;
        session.clear(settings);
        if let Err(e) = settings.persist().await {
            warning!("Failed to persist session logout: {}", e);
        }
        info!("Session invalidated remotely, please re-run scroblcli auth.");
    }

    /// Evaluates the currently tracked item for a derived scrobble and
    /// enqueues it. Returns whether a submission should be triggered.
    async fn enqueue_derived(&self, inner: &mut Inner, now: i64) -> crate::Res<bool> {
        let Some(derived) = derived_scrobble(&inner.playing, now) else {
            return Ok(false);
        };
        let started_at = inner.playing.as_ref().map(|p| p.started_at).unwrap_or(now);
        if let Some(playing) = inner.playing.as_mut() {
            playing.scrobbled = true;
        }
        inner
            .cache
            .add(derived, started_at)
            .await
            .map_err(|e| e.to_string())?;
        Ok(!inner.config.offline && inner.session.authenticated())
    }

    async fn store_playing(inner: &mut Inner) -> crate::Res<()> {
        match &inner.playing {
            Some(playing) => {
                let value = serde_json::to_value(playing).map_err(|e| e.to_string())?;
                inner.settings.set(GROUP_PLAYBACK, "current", value);
            }
            None => inner.settings.remove(GROUP_PLAYBACK, "current"),
        }
        inner.settings.persist().await.map_err(|e| e.to_string())?;
        Ok(())
    }

    async fn arm_refresh_timer(self: &Arc<Self>, interval: Duration) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.refresh_timer.take() {
            timer.abort();
        }
        let scrobbler = Arc::clone(self);
        inner.refresh_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            scrobbler.request_new_access_token().await;
        }));
    }
}

impl Drop for Scrobbler {
    fn drop(&mut self) {
        // Detach timer callbacks so an aborted request cannot apply partial
        // side effects after teardown.
        let inner = self.inner.get_mut();
        if let Some(timer) = inner.submit_timer.take() {
            timer.abort();
        }
        if let Some(timer) = inner.refresh_timer.take() {
            timer.abort();
        }
    }
}

fn timer_armed(handle: &Option<JoinHandle<()>>) -> bool {
    handle.as_ref().is_some_and(|h| !h.is_finished())
}

/// Whether an incoming scrobble refers to the currently tracked item.
fn same_item(track: &TrackMetadata, playing: &TrackMetadata) -> bool {
    track.artist == playing.artist && track.title == playing.title && track.radio == playing.radio
}

/// Selects the next batch from the queue, in insertion order.
///
/// Records already marked `sent` are skipped. An error-flagged record is
/// submitted alone to isolate the culprit: assembly stops before it when the
/// batch already holds records, and stops right after it when it leads.
pub fn assemble_batch(records: &[ListenRecord], max: usize) -> Vec<u64> {
    let mut batch = Vec::new();
    for record in records {
        if record.sent {
            continue;
        }
        if record.error && !batch.is_empty() {
            break;
        }
        batch.push(record.id);
        if batch.len() >= max || record.error {
            break;
        }
    }
    batch
}

/// Derived scrobble rule for continuous streams without track-end events:
/// a never-scrobbled live/radio item tracked for more than 30 seconds earns
/// a synthesized scrobble with its elapsed time as the duration.
pub fn derived_scrobble(playing: &Option<PlayingTrack>, now: i64) -> Option<TrackMetadata> {
    let playing = playing.as_ref()?;
    let elapsed = (now - playing.started_at).max(0);
    if playing.scrobbled
        || !playing.metadata.is_good()
        || !playing.metadata.radio
        || elapsed <= DERIVED_SCROBBLE_MIN_SECS
    {
        return None;
    }
    let mut metadata = playing.metadata.clone();
    metadata.duration_secs = Some(elapsed as u64);
    Some(metadata)
}
