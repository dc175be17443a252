use reqwest::StatusCode;
use serde_json::Value;

/// Outcome class of one API reply.
///
/// `ApiError` means the server answered with a structured rejection, as
/// opposed to `ServerError` which covers transport failures and non-200
/// replies without an API-level error body. The distinction drives the
/// retry policy: server errors retry the whole batch unmarked, API errors
/// assign blame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Success,
    ApiError,
    ServerError,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub kind: ReplyKind,
    pub json: Option<Value>,
    pub error_description: String,
    /// Access denied / forbidden / authentication required: the session
    /// was invalidated remotely and must not be retried.
    pub session_expired: bool,
}

/// Classifies a response from its HTTP status and body.
///
/// Failure bodies may carry `{error, error_description}` or `{code, error}`;
/// either shape upgrades the classification to an API error with the
/// server-provided description.
pub fn classify(status: StatusCode, body: &[u8]) -> Reply {
    let mut kind = if status == StatusCode::OK {
        ReplyKind::Success
    } else {
        ReplyKind::ServerError
    };
    let mut error_description = if status == StatusCode::OK {
        String::new()
    } else {
        format!("Received HTTP code {}", status.as_u16())
    };

    let json: Option<Value> = serde_json::from_slice(body).ok();
    if let Some(obj) = json.as_ref().and_then(Value::as_object) {
        if let (Some(_), Some(description)) = (obj.get("error"), obj.get("error_description")) {
            error_description = description.as_str().unwrap_or_default().to_string();
            kind = ReplyKind::ApiError;
        } else if let (Some(code), Some(error)) = (obj.get("code"), obj.get("error")) {
            error_description = format!("{} ({})", error.as_str().unwrap_or_default(), code);
            kind = ReplyKind::ApiError;
        }
    }

    let session_expired = matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    );

    Reply {
        kind,
        json,
        error_description,
        session_expired,
    }
}
