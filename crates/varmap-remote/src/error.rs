//! Error types for the remote backend client.

use thiserror::Error;

/// Every failure of a remote call. Callers display it; nothing panics.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// A required setting is absent.
    #[error("remote backend is not configured: {0}")]
    NotConfigured(String),

    /// The backend answered with a status of 400 or above.
    #[error("remote backend returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body as text.
        body: String,
    },

    /// The request never produced a response.
    #[error("request to remote backend failed: {0}")]
    Transport(String),

    /// The response body could not be understood.
    #[error("unexpected response from remote backend: {0}")]
    Decode(String),
}

impl RemoteError {
    /// HTTP status of the failed call, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured(_) | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(RemoteError::Transport("connection refused".to_string()).is_retryable());
        assert!(
            RemoteError::Http {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !RemoteError::Http {
                status: 404,
                body: "missing".to_string()
            }
            .is_retryable()
        );
        assert!(!RemoteError::NotConfigured("token".to_string()).is_retryable());
    }

    #[test]
    fn status_only_for_http_errors() {
        let err = RemoteError::Http {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("unauthorized"));
        assert_eq!(RemoteError::Decode("x".to_string()).status(), None);
    }
}
