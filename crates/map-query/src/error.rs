use thiserror::Error;

use crate::backend::Endpoint;

/// Failure to turn user text into coordinates. Never reaches the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid input {input:?}: {reason}")]
    InvalidFormat { input: String, reason: String },
    #[error("a polygon needs at least 3 points, got {found}")]
    TooFewVertices { found: usize },
}

/// Coarse classification of a [`ParseError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidFormat,
}

impl ParseError {
    pub(crate) fn invalid(input: &str, reason: impl Into<String>) -> Self {
        ParseError::InvalidFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Every parse failure is an invalid-format failure from the caller's point of view.
    pub fn kind(&self) -> ParseErrorKind {
        ParseErrorKind::InvalidFormat
    }
}

/// Where a backend request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The service rejected the request (4xx).
    Client,
    /// The service failed or answered with an unexpected non-2xx status.
    Server,
    /// The request never completed: connect failure, reset, or timeout.
    Network,
    /// A 2xx response whose body could not be decoded.
    Decode,
}

impl ErrorClass {
    pub fn label(self) -> &'static str {
        match self {
            ErrorClass::Client => "client",
            ErrorClass::Server => "server",
            ErrorClass::Network => "network",
            ErrorClass::Decode => "decode",
        }
    }
}

/// A failed call to the spatial-index service.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {endpoint} failed: service rejected it with status {status}")]
    Client { endpoint: Endpoint, status: u16 },
    #[error("request to {endpoint} failed: service answered with status {status}")]
    Server { endpoint: Endpoint, status: u16 },
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: Endpoint,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("request to {endpoint} failed: malformed response: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BackendError {
    /// Map a non-success HTTP status onto the client/server split.
    pub fn from_status(endpoint: Endpoint, status: u16) -> Self {
        if (400..500).contains(&status) {
            BackendError::Client { endpoint, status }
        } else {
            BackendError::Server { endpoint, status }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            BackendError::Client { .. } => ErrorClass::Client,
            BackendError::Server { .. } => ErrorClass::Server,
            BackendError::Network { .. } => ErrorClass::Network,
            BackendError::Decode { .. } => ErrorClass::Decode,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            BackendError::Client { endpoint, .. }
            | BackendError::Server { endpoint, .. }
            | BackendError::Network { endpoint, .. }
            | BackendError::Decode { endpoint, .. } => *endpoint,
        }
    }
}

/// Terminal failure of a single user action.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl QueryError {
    /// Text shown to the user when the action fails.
    pub fn user_message(&self) -> String {
        match self {
            QueryError::Parse(err) => err.to_string(),
            QueryError::Backend(err) => match err.endpoint() {
                Endpoint::Point => "Failed to add point to the system",
                Endpoint::NearestNeighbor => "Failed to find nearest neighbor",
                Endpoint::RangeQuery => "Failed to execute range query",
                Endpoint::Intersection => "Failed to detect intersections",
            }
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert_eq!(
            BackendError::from_status(Endpoint::Point, 400).class(),
            ErrorClass::Client
        );
        assert_eq!(
            BackendError::from_status(Endpoint::Point, 404).class(),
            ErrorClass::Client
        );
        assert_eq!(
            BackendError::from_status(Endpoint::Point, 500).class(),
            ErrorClass::Server
        );
        assert_eq!(
            BackendError::from_status(Endpoint::Point, 302).class(),
            ErrorClass::Server
        );
    }

    #[test]
    fn test_every_backend_error_reads_as_request_failed() {
        let err = BackendError::from_status(Endpoint::RangeQuery, 503);
        assert!(err.to_string().contains("failed"));

        let err = BackendError::from_status(Endpoint::RangeQuery, 422);
        assert!(err.to_string().contains("failed"));
    }

    #[test]
    fn test_user_messages() {
        let err = QueryError::from(BackendError::from_status(Endpoint::NearestNeighbor, 500));
        assert_eq!(err.user_message(), "Failed to find nearest neighbor");

        let err = QueryError::from(ParseError::TooFewVertices { found: 2 });
        assert_eq!(
            err.user_message(),
            "a polygon needs at least 3 points, got 2"
        );
        assert!(matches!(err, QueryError::Parse(ref p) if p.kind() == ParseErrorKind::InvalidFormat));
    }
}
