use std::fmt;

use reqwest::StatusCode;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors returned when talking to the Docker Hub
///
/// The first five variants are the kinds a user can act upon, the last two
/// cover unexpected registry answers. Every variant owns plain strings so
/// that the error can be cloned into a removal outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("registry answered with status {status}: {message}")]
    Registry { status: u16, message: String },

    #[error("unexpected response payload: {0}")]
    Decode(String),
}

/// The closed set of error kinds reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    Permission,
    NotFound,
    Network,
    Validation,
    Registry,
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Auth => "AuthError",
            ErrorKind::Permission => "PermissionError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::Network => "NetworkError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Registry => "RegistryError",
            ErrorKind::Decode => "DecodeError",
        };
        f.write_str(name)
    }
}

// Registry bodies can be whole HTML pages, keep only the beginning
const MAX_BODY_CHARS: usize = 200;

impl HubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::Auth(_) => ErrorKind::Auth,
            HubError::Permission(_) => ErrorKind::Permission,
            HubError::NotFound(_) => ErrorKind::NotFound,
            HubError::Network(_) => ErrorKind::Network,
            HubError::Validation(_) => ErrorKind::Validation,
            HubError::Registry { .. } => ErrorKind::Registry,
            HubError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// The human readable part of the error, without the kind prefix
    pub fn detail(&self) -> &str {
        match self {
            HubError::Auth(msg)
            | HubError::Permission(msg)
            | HubError::NotFound(msg)
            | HubError::Network(msg)
            | HubError::Validation(msg)
            | HubError::Decode(msg) => msg,
            HubError::Registry { message, .. } => message,
        }
    }

    /// Maps a non-successful HTTP status to the matching error kind
    ///
    /// `what` names the resource the request was about (e.g. `acme/app:v1`),
    /// `body` is the raw response body which gets trimmed and truncated.
    pub fn from_status(status: StatusCode, what: &str, body: &str) -> Self {
        let body = truncate(body.trim(), MAX_BODY_CHARS);
        let message = if body.is_empty() {
            what.to_string()
        } else {
            format!("{what} ({body})")
        };

        match status {
            StatusCode::UNAUTHORIZED => HubError::Auth(message),
            StatusCode::FORBIDDEN => HubError::Permission(message),
            StatusCode::NOT_FOUND => HubError::NotFound(message),
            status => HubError::Registry {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HubError::Decode(err.to_string())
        } else {
            HubError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for HubError {
    fn from(err: url::ParseError) -> Self {
        HubError::Validation(format!("failed building the request url: {err}"))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
