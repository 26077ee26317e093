//! Remote fetch error type.

use storefront_core::Error;

/// Failure of a single API request.
///
/// `status` is `None` when no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn timeout() -> Self {
        Self::new(None, "request timed out")
    }

    pub fn network() -> Self {
        Self::new(None, "network error")
    }

    /// Attach the status of a response whose body could not be read.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::timeout()
        } else {
            tracing::debug!(error = %err, "request failed without response");
            FetchError::network()
        }
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::Fetch { status: err.status, message: err.message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(FetchError::timeout().to_string(), "request timed out");
        assert_eq!(FetchError::new(Some(500), "HTTP 500").to_string(), "HTTP 500");
    }

    #[test]
    fn test_with_status_keeps_message() {
        let err = FetchError::network().with_status(200);
        assert_eq!(err, FetchError::new(Some(200), "network error"));
    }

    #[test]
    fn test_into_core_error() {
        let err: Error = FetchError::new(Some(404), "not found").into();
        assert!(matches!(err, Error::Fetch { status: Some(404), .. }));
        assert!(err.to_string().starts_with("FETCH_ERROR"));
    }
}
