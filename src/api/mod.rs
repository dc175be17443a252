//! # API Module
//!
//! HTTP endpoints for the local callback server used during the OAuth
//! authorization-code flow.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives the redirect from the MusicBrainz authorization
//!   server and stores the captured code (or error) for the waiting auth
//!   flow to pick up.
//! - [`health`] - Health check returning application status and version.
//!
//! The module is built on the [Axum](https://docs.rs/axum) web framework;
//! each endpoint is an async function wired into the router in
//! [`crate::server`]. Shared state between the handler and the auth flow is
//! an `Arc<Mutex<Option<AuthCallback>>>` passed as an axum `Extension`.

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
