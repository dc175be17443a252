use std::{sync::Arc, time::Duration};

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config,
    listenbrainz::response::{self, ReplyKind},
    types::{AuthCallback, Token},
    utils, warning,
};

/// Failure of a token-endpoint exchange.
///
/// `session_expired` is set when the endpoint answered access-denied,
/// forbidden or authentication-required; the caller must treat that as the
/// session being invalidated remotely, not as a retryable exchange failure.
#[derive(Debug)]
pub struct AuthError {
    pub message: String,
    pub session_expired: bool,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Builds the MusicBrainz authorization URL the user is sent to.
pub fn authorize_url() -> String {
    format!(
        "{authorize_url}?response_type=code&client_id={client_id}&redirect_uri={redirect_uri}&scope={scope}",
        authorize_url = &config::oauth_authorize_url(),
        client_id = &config::oauth_client_id(),
        redirect_uri = &config::oauth_redirect_uri(),
        scope = &config::oauth_scope()
    )
}

/// Opens the authorization URL in the default browser, falling back to
/// printing it for manual navigation.
pub fn open_authorize_url(auth_url: &str) {
    if webbrowser::open(auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }
}

/// Waits for the OAuth redirect to arrive at the local callback server.
///
/// Polls the shared state for up to 60 seconds while the axum handler runs
/// concurrently. Returns `None` on timeout.
pub async fn wait_for_callback(
    shared_state: Arc<Mutex<Option<AuthCallback>>>,
) -> Option<AuthCallback> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(callback) = lock.as_ref() {
            return Some(callback.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Exchanges an authorization code for an access token.
pub async fn exchange_code(code: &str) -> Result<Token, AuthError> {
    request_token(&[
        ("client_id", config::oauth_client_id()),
        ("client_secret", config::oauth_client_secret()),
        ("grant_type", "authorization_code".to_string()),
        ("code", code.to_string()),
        ("redirect_uri", config::oauth_redirect_uri()),
    ])
    .await
}

/// Exchanges a refresh token for a new access token.
pub async fn exchange_refresh_token(refresh_token: &str) -> Result<Token, AuthError> {
    request_token(&[
        ("client_id", config::oauth_client_id()),
        ("client_secret", config::oauth_client_secret()),
        ("grant_type", "refresh_token".to_string()),
        ("refresh_token", refresh_token.to_string()),
    ])
    .await
}

/// Maps a token-endpoint reply to its JSON payload or a structured failure
/// carrying the session-expired indicator.
pub fn token_reply(status: StatusCode, body: &[u8]) -> Result<Value, AuthError> {
    let reply = response::classify(status, body);
    if reply.kind != ReplyKind::Success {
        return Err(AuthError {
            message: reply.error_description,
            session_expired: reply.session_expired,
        });
    }
    Ok(reply.json.unwrap_or(Value::Null))
}

async fn request_token(params: &[(&str, String)]) -> Result<Token, AuthError> {
    let client = Client::new();
    let res = client
        .post(&config::oauth_token_url())
        .form(params)
        .send()
        .await
        .map_err(transport_error)?;

    let status = res.status();
    let body = res.bytes().await.map_err(transport_error)?;
    let json = token_reply(status, &body)?;

    let (Some(access_token), Some(expires_in), Some(token_type)) = (
        json["access_token"].as_str(),
        json["expires_in"].as_i64(),
        json["token_type"].as_str(),
    ) else {
        return Err(AuthError {
            message: "Json access_token, expires_in or token_type is missing.".to_string(),
            session_expired: false,
        });
    };

    Ok(Token {
        access_token: access_token.to_string(),
        token_type: token_type.to_string(),
        refresh_token: json["refresh_token"].as_str().unwrap_or_default().to_string(),
        expires_in,
        login_time: utils::now_epoch(),
    })
}

fn transport_error(e: reqwest::Error) -> AuthError {
    AuthError {
        message: e.to_string(),
        session_expired: false,
    }
}
