//! Request-level probe errors.

use axum::http::StatusCode;
use thiserror::Error;

/// Failures that end a probe request.
///
/// Per-path failures are not errors; they are reported through
/// [`crate::probe::PathOutcome`] and the `probe_success` gauge.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Target parameter is missing")]
    MissingTarget,

    #[error("The JsonPath to lookup")]
    MissingPath,

    #[error("Invalid metric name '{name}' derived from jsonpath '{path}'")]
    InvalidMetricName { path: String, name: String },

    #[error("Duplicate metric name '{0}'")]
    DuplicateMetricName(String),

    #[error("Failed to fetch target: {0}")]
    FetchFailure(#[source] reqwest::Error),

    #[error("{}", error_chain(.0))]
    BodyReadError(reqwest::Error),
}

/// Render an error followed by each of its sources, `outer: inner: ...`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // Some wrappers already repeat their cause in their own message
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

impl ProbeError {
    /// HTTP status returned to the caller for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProbeError::MissingTarget
            | ProbeError::MissingPath
            | ProbeError::InvalidMetricName { .. }
            | ProbeError::DuplicateMetricName(_) => StatusCode::BAD_REQUEST,
            ProbeError::FetchFailure(_) => StatusCode::BAD_GATEWAY,
            ProbeError::BodyReadError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller sent a bad request.
    pub fn is_invalid_request(&self) -> bool {
        self.status_code() == StatusCode::BAD_REQUEST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ProbeError::MissingTarget.to_string(),
            "Target parameter is missing"
        );
        assert_eq!(ProbeError::MissingPath.to_string(), "The JsonPath to lookup");
        assert_eq!(
            ProbeError::DuplicateMetricName("b".into()).to_string(),
            "Duplicate metric name 'b'"
        );
    }

    #[derive(Debug, Error)]
    #[error("connection closed")]
    struct Closed;

    #[derive(Debug, Error)]
    #[error("error reading body")]
    struct ReadBody(#[source] Closed);

    #[derive(Debug, Error)]
    #[error("error decoding response body")]
    struct Decode(#[source] ReadBody);

    #[test]
    fn test_error_chain() {
        assert_eq!(
            error_chain(&Decode(ReadBody(Closed))),
            "error decoding response body: error reading body: connection closed"
        );
        assert_eq!(error_chain(&Closed), "connection closed");
    }

    #[test]
    fn test_validation_status_codes() {
        assert_eq!(
            ProbeError::MissingTarget.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(ProbeError::MissingPath.is_invalid_request());
        assert!(
            ProbeError::InvalidMetricName {
                path: "a[0]".into(),
                name: "a[0]".into()
            }
            .is_invalid_request()
        );
    }
}
