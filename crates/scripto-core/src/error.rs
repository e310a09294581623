//! API error handling
//!
//! Every failure at the transport boundary is normalized into [`ApiError`],
//! whatever shape the server used to report it. Callers only ever need
//! [`ApiError::message`] to show something to the user.

use std::io;
use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Fallback message when the server gives us nothing to show
pub const GENERIC_MESSAGE: &str = "An error occurred while communicating with the server";

/// A validation failure reported for one input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Last segment of the server's `loc` path (e.g. `title`)
    pub field: String,
    /// Server-provided message
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur talking to the Scripto API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Server unreachable, or a non-2xx answer with no usable body
    #[error("{message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// Structured per-field messages from a list-shaped `detail`
    #[error("{}", join_fields(.fields))]
    Validation { status: u16, fields: Vec<FieldError> },

    /// Single `detail` or `message` string from the server
    #[error("{message}")]
    Application { status: u16, message: String },

    /// Notification stream failed or closed uncleanly
    #[error("{0}")]
    Stream(String),

    /// Local file could not be read for upload
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApiError {
    /// Build an error from a non-2xx response status and its raw body
    ///
    /// Understands `{detail: string}`, `{message: string}` and
    /// `{detail: [{loc: [...], msg: string}, ...]}`. Anything else falls back
    /// to a generic network error.
    pub fn from_response(status: u16, body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return ApiError::Network {
                status: Some(status),
                message: GENERIC_MESSAGE.to_string(),
            };
        };

        match value.get("detail") {
            Some(Value::String(detail)) => {
                return ApiError::Application {
                    status,
                    message: detail.clone(),
                };
            }
            Some(Value::Array(entries)) => {
                let fields: Vec<FieldError> = entries.iter().filter_map(parse_field_error).collect();
                if !fields.is_empty() {
                    return ApiError::Validation { status, fields };
                }
            }
            _ => {}
        }

        if let Some(Value::String(message)) = value.get("message") {
            return ApiError::Application {
                status,
                message: message.clone(),
            };
        }

        ApiError::Network {
            status: Some(status),
            message: GENERIC_MESSAGE.to_string(),
        }
    }

    /// The single human-readable message for this error
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation { fields, .. } => fields
                .first()
                .map(|f| f.to_string())
                .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            other => other.to_string(),
        }
    }

    /// Per-field validation messages (empty for other kinds)
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ApiError::Validation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Network { status, .. } => *status,
            ApiError::Validation { status, .. } | ApiError::Application { status, .. } => {
                Some(*status)
            }
            ApiError::Stream(_) | ApiError::Io { .. } => None,
        }
    }

    /// Whether retrying later by hand could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network { status, .. } => status.map_or(true, |s| s >= 500),
            ApiError::Stream(_) => true,
            ApiError::Application { status, .. } => *status >= 500,
            ApiError::Validation { .. } | ApiError::Io { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_decode() {
            format!("Unexpected response from server: {}", error)
        } else if error.is_timeout() {
            "Request to server timed out".to_string()
        } else if error.is_connect() {
            "Could not reach the server. Check that it is running.".to_string()
        } else {
            GENERIC_MESSAGE.to_string()
        };

        ApiError::Network {
            status: error.status().map(|s| s.as_u16()),
            message,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ApiError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        ApiError::Stream(format!("WebSocket connection error: {}", error))
    }
}

fn parse_field_error(entry: &Value) -> Option<FieldError> {
    let message = entry.get("msg")?.as_str()?.to_string();
    let field = entry
        .get("loc")
        .and_then(Value::as_array)
        .and_then(|loc| loc.last())
        .map(|segment| match segment {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "body".to_string());

    Some(FieldError { field, message })
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let err = ApiError::from_response(409, r#"{"detail": "Script content already exists."}"#);

        assert!(matches!(err, ApiError::Application { status: 409, .. }));
        assert_eq!(err.message(), "Script content already exists.");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_message_field() {
        let err = ApiError::from_response(400, r#"{"message": "Bad tag list"}"#);
        assert_eq!(err.message(), "Bad tag list");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_validation_list() {
        let body = r#"{"detail": [
            {"loc": ["body", "title"], "msg": "String should have at least 3 characters", "type": "string_too_short"},
            {"loc": ["body", "tags"], "msg": "Field required", "type": "missing"}
        ]}"#;
        let err = ApiError::from_response(422, body);

        let fields = err.field_errors();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "title");
        assert_eq!(fields[1].field, "tags");
        assert_eq!(fields[1].message, "Field required");

        // Single message reports the first entry, Display joins them all
        assert_eq!(err.message(), "title: String should have at least 3 characters");
        assert_eq!(
            err.to_string(),
            "title: String should have at least 3 characters; tags: Field required"
        );
    }

    #[test]
    fn test_validation_numeric_loc() {
        let body = r#"{"detail": [{"loc": ["query", "limit", 0], "msg": "bad"}]}"#;
        let err = ApiError::from_response(422, body);
        assert_eq!(err.field_errors()[0].field, "0");
    }

    #[test]
    fn test_unparseable_body() {
        let err = ApiError::from_response(502, "<html>Bad Gateway</html>");

        assert!(matches!(err, ApiError::Network { status: Some(502), .. }));
        assert_eq!(err.message(), GENERIC_MESSAGE);
        assert!(err.is_transient());
    }

    #[test]
    fn test_json_without_known_fields() {
        let err = ApiError::from_response(500, r#"{"error": "boom"}"#);
        assert!(matches!(err, ApiError::Network { .. }));
        assert!(err.field_errors().is_empty());
    }

    #[test]
    fn test_stream_error_display() {
        let err = ApiError::Stream("WebSocket connection closed unexpectedly".to_string());
        assert_eq!(err.message(), "WebSocket connection closed unexpectedly");
        assert!(err.status().is_none());
        assert!(err.is_transient());
    }
}
