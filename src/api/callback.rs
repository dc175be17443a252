use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::Mutex;

use crate::types::AuthCallback;

/// OAuth redirect handler.
///
/// Captures either the authorization code or the provider-reported error
/// into the shared state; the auth flow polls for it. The code exchange
/// itself happens in the scrobbler so a failed exchange can be reported
/// through the normal authentication-failure path.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(shared_state): Extension<Arc<Mutex<Option<AuthCallback>>>>,
) -> Html<&'static str> {
    let mut state = shared_state.lock().await;

    if let Some(error) = params.get("error") {
        *state = Some(AuthCallback::Error(error.clone()));
        Html("<h4>Authorization failed.</h4>")
    } else if let Some(code) = params.get("code") {
        *state = Some(AuthCallback::Code(code.clone()));
        Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
    } else {
        *state = Some(AuthCallback::Error("Redirect missing token code".to_string()));
        Html("<h4>Redirect missing token code.</h4>")
    }
}
