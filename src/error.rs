use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable token and the interactive flow failed or was unavailable.
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Remote API error: {0}")]
    RemoteApi(#[from] RemoteApiError),

    #[error("Local I/O error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn authentication(msg: impl Into<String>) -> Self {
        Error::Authentication(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Rate limits, server errors and network failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RemoteApi(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            Error::RemoteApi(e) => Some(e.kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    BadRequest,
    Unauthorized,
    PermissionDenied,
    NotFound,
    RateLimited,
    Server,
    Network,
    InvalidResponse,
    Other,
}

impl RemoteErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => RemoteErrorKind::BadRequest,
            401 => RemoteErrorKind::Unauthorized,
            403 => RemoteErrorKind::PermissionDenied,
            404 => RemoteErrorKind::NotFound,
            429 => RemoteErrorKind::RateLimited,
            500..=599 => RemoteErrorKind::Server,
            _ => RemoteErrorKind::Other,
        }
    }

    /// Refines the status with the first `errors[].reason` of Google's error
    /// body. Drive reports rate limits as 403.
    pub fn from_response(status: u16, reason: Option<&str>) -> Self {
        match reason {
            Some("userRateLimitExceeded" | "rateLimitExceeded") => RemoteErrorKind::RateLimited,
            _ => Self::from_status(status),
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::BadRequest => "bad request",
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::PermissionDenied => "permission denied",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::Server => "server error",
            RemoteErrorKind::Network => "network error",
            RemoteErrorKind::InvalidResponse => "invalid response",
            RemoteErrorKind::Other => "unexpected status",
        };
        f.write_str(s)
    }
}

/// A request the remote service rejected or that never got an answer.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct RemoteApiError {
    pub kind: RemoteErrorKind,
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteApiError {
    pub fn new(kind: RemoteErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::from_status(status), Some(status), message)
    }

    pub fn from_response(status: u16, reason: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::from_response(status, reason), Some(status), message)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            RemoteErrorKind::RateLimited | RemoteErrorKind::Server | RemoteErrorKind::Network
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_decode() {
            RemoteErrorKind::InvalidResponse
        } else if let Some(status) = e.status() {
            RemoteErrorKind::from_status(status.as_u16())
        } else {
            RemoteErrorKind::Network
        };
        Error::RemoteApi(RemoteApiError::new(
            kind,
            e.status().map(|s| s.as_u16()),
            e.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RemoteErrorKind::from_status(404), RemoteErrorKind::NotFound);
        assert_eq!(RemoteErrorKind::from_status(429), RemoteErrorKind::RateLimited);
        assert_eq!(RemoteErrorKind::from_status(503), RemoteErrorKind::Server);
        assert_eq!(RemoteErrorKind::from_status(418), RemoteErrorKind::Other);
    }

    #[test]
    fn test_drive_rate_limit_reasons() {
        assert_eq!(
            RemoteErrorKind::from_response(403, Some("userRateLimitExceeded")),
            RemoteErrorKind::RateLimited
        );
        assert_eq!(
            RemoteErrorKind::from_response(403, Some("rateLimitExceeded")),
            RemoteErrorKind::RateLimited
        );
        assert_eq!(
            RemoteErrorKind::from_response(403, Some("insufficientPermissions")),
            RemoteErrorKind::PermissionDenied
        );
        assert_eq!(RemoteErrorKind::from_response(403, None), RemoteErrorKind::PermissionDenied);

        let err = Error::from(RemoteApiError::from_response(
            403,
            Some("userRateLimitExceeded"),
            "User Rate Limit Exceeded",
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(Error::from(RemoteApiError::from_status(429, "slow down")).is_retryable());
        assert!(Error::from(RemoteApiError::from_status(502, "bad gateway")).is_retryable());
        assert!(!Error::from(RemoteApiError::from_status(403, "forbidden")).is_retryable());
        assert!(!Error::authentication("no token").is_retryable());
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = Error::from(RemoteApiError::from_status(404, "File not found: abc"));
        assert_eq!(err.to_string(), "Remote API error: not found: File not found: abc");
    }
}
