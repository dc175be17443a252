//! Configuration management for the ListenBrainz scrobbler.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. It provides a centralized way to
//! access API endpoints, OAuth client credentials and the local callback
//! server address.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (the public ListenBrainz/MusicBrainz endpoints)

use base64::{Engine, engine::general_purpose::STANDARD};
use std::{env, path::PathBuf};

const DEFAULT_API_URL: &str = "https://api.listenbrainz.org";
const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "https://musicbrainz.org/oauth2/authorize";
const DEFAULT_OAUTH_TOKEN_URL: &str = "https://musicbrainz.org/oauth2/token";
const DEFAULT_OAUTH_SCOPE: &str = "profile;email;tag;rating;collection;submit_isrc;submit_barcode";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8889";

// Registered client credentials, stored base64-encoded like upstream
// clients do to keep them out of plain-text grep results.
const CLIENT_ID_B64: &str = "b2VBVU53cVNRZXIwZXIwOUZpcWkwUQ==";
const CLIENT_SECRET_B64: &str = "Uk9GZ2hrZVEzRjNvUHlFaHFpeVdQQQ==";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `scroblcli/.env`. The file is optional; when it
/// is missing all configuration falls back to the built-in defaults.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/scroblcli/.env`
/// - macOS: `~/Library/Application Support/scroblcli/.env`
/// - Windows: `%LOCALAPPDATA%/scroblcli/.env`
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or an existing
/// `.env` file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("scroblcli/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Returns the ListenBrainz API base URL.
///
/// Reads `LISTENBRAINZ_API_URL`, defaulting to the public API. All listen
/// submission requests go to `{api_url}/1/submit-listens`.
pub fn api_url() -> String {
    env::var("LISTENBRAINZ_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Returns the MusicBrainz OAuth authorization URL.
///
/// Reads `MUSICBRAINZ_OAUTH_AUTHORIZE_URL`. Users are redirected here to
/// grant the application access during the auth flow.
pub fn oauth_authorize_url() -> String {
    env::var("MUSICBRAINZ_OAUTH_AUTHORIZE_URL")
        .unwrap_or_else(|_| DEFAULT_OAUTH_AUTHORIZE_URL.to_string())
}

/// Returns the MusicBrainz OAuth token exchange URL.
///
/// Reads `MUSICBRAINZ_OAUTH_TOKEN_URL`. Authorization codes and refresh
/// tokens are exchanged for access tokens here.
pub fn oauth_token_url() -> String {
    env::var("MUSICBRAINZ_OAUTH_TOKEN_URL")
        .unwrap_or_else(|_| DEFAULT_OAUTH_TOKEN_URL.to_string())
}

/// Returns the OAuth client ID.
///
/// Reads `MUSICBRAINZ_OAUTH_CLIENT_ID`, falling back to the embedded
/// registered client ID.
pub fn oauth_client_id() -> String {
    env::var("MUSICBRAINZ_OAUTH_CLIENT_ID").unwrap_or_else(|_| decode_b64(CLIENT_ID_B64))
}

/// Returns the OAuth client secret.
///
/// Reads `MUSICBRAINZ_OAUTH_CLIENT_SECRET`, falling back to the embedded
/// registered client secret.
pub fn oauth_client_secret() -> String {
    env::var("MUSICBRAINZ_OAUTH_CLIENT_SECRET").unwrap_or_else(|_| decode_b64(CLIENT_SECRET_B64))
}

/// Returns the OAuth scope requested during authorization.
pub fn oauth_scope() -> String {
    env::var("MUSICBRAINZ_OAUTH_SCOPE").unwrap_or_else(|_| DEFAULT_OAUTH_SCOPE.to_string())
}

/// Returns the bind address for the local OAuth callback server.
///
/// Reads `SERVER_ADDRESS`, e.g. `127.0.0.1:8889`. The port must match the
/// redirect URI registered with the OAuth provider.
pub fn server_addr() -> String {
    env::var("SERVER_ADDRESS").unwrap_or_else(|_| DEFAULT_SERVER_ADDRESS.to_string())
}

/// Returns the OAuth redirect URI handed to the authorization endpoint.
///
/// Reads `OAUTH_REDIRECT_URI` if set, otherwise derives
/// `http://localhost:{port}/callback` from the server address.
pub fn oauth_redirect_uri() -> String {
    env::var("OAUTH_REDIRECT_URI").unwrap_or_else(|_| {
        let addr = server_addr();
        let port = addr.rsplit(':').next().unwrap_or("8889");
        format!("http://localhost:{}/callback", port)
    })
}

fn decode_b64(value: &str) -> String {
    STANDARD
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}
