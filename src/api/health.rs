use axum::response::Json;
use serde_json::{Value, json};

/// Health check for the short-lived callback server, reporting the
/// application name and version.
pub async fn health() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
