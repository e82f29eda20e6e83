//! Error types and handling for Octowatt
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Octowatt operations
pub type Result<T> = std::result::Result<T, OctowattError>;

/// Main error type for Octowatt
#[derive(Debug, Error)]
pub enum OctowattError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Transport-level errors (connect, reset, DNS)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Authentication/authorization errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Provider API reported an application-level error
    #[error("API error: {message}")]
    Api { message: String },

    /// Provider answered with a non-success HTTP status
    #[error("Upstream error: HTTP {status} - {message}")]
    Upstream { status: u16, message: String },

    /// A meter point is missing consumption, tariff or standing-charge data
    #[error("Missing data: {what}")]
    MissingData { what: String },

    /// No meter point of the requested fuel produced a summary
    #[error("No energy data available")]
    NoData,

    /// The user has not linked an account yet
    #[error("User not registered: {user_id}")]
    NotRegistered { user_id: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl OctowattError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        OctowattError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        OctowattError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        OctowattError::Io {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        OctowattError::Serialization {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        OctowattError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        OctowattError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        OctowattError::Auth {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        OctowattError::Api {
            message: message.into(),
        }
    }

    /// Create a new upstream status error
    pub fn upstream<S: Into<String>>(status: u16, message: S) -> Self {
        OctowattError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create a new missing-data error
    pub fn missing_data<S: Into<String>>(what: S) -> Self {
        OctowattError::MissingData { what: what.into() }
    }

    /// Create a new not-registered error
    pub fn not_registered<S: Into<String>>(user_id: S) -> Self {
        OctowattError::NotRegistered {
            user_id: user_id.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        OctowattError::Generic {
            message: message.into(),
        }
    }

    /// Whether a retry has a chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            OctowattError::Network { .. } | OctowattError::Timeout { .. } => true,
            OctowattError::Upstream { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> String {
        match self {
            OctowattError::Validation { message, .. } => message.clone(),
            OctowattError::Auth { .. } => {
                "Octopus Energy rejected your API key. Run setup again with a valid key."
                    .to_string()
            }
            OctowattError::NotRegistered { .. } => {
                "You haven't set up your Octopus Energy account yet. Use setup to get started."
                    .to_string()
            }
            OctowattError::NoData => {
                "No energy data available for the selected period.".to_string()
            }
            _ => "An error occurred while processing your request. Please try again later."
                .to_string(),
        }
    }
}

impl From<std::io::Error> for OctowattError {
    fn from(err: std::io::Error) -> Self {
        OctowattError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for OctowattError {
    fn from(err: serde_yaml::Error) -> Self {
        OctowattError::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for OctowattError {
    fn from(err: serde_json::Error) -> Self {
        OctowattError::serialization(err.to_string())
    }
}

impl From<reqwest::Error> for OctowattError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OctowattError::timeout(err.to_string())
        } else if err.is_decode() {
            OctowattError::serialization(err.to_string())
        } else if let Some(status) = err.status() {
            OctowattError::upstream(status.as_u16(), err.to_string())
        } else {
            OctowattError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for OctowattError {
    fn from(err: chrono::ParseError) -> Self {
        OctowattError::Validation {
            field: "datetime".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OctowattError::config("test config error");
        assert!(matches!(err, OctowattError::Config { .. }));

        let err = OctowattError::missing_data("tariff");
        assert!(matches!(err, OctowattError::MissingData { .. }));

        let err = OctowattError::validation("field", "test validation error");
        assert!(matches!(err, OctowattError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = OctowattError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = OctowattError::upstream(503, "unavailable");
        assert_eq!(format!("{}", err), "Upstream error: HTTP 503 - unavailable");
    }

    #[test]
    fn test_transient_classification() {
        assert!(OctowattError::network("reset").is_transient());
        assert!(OctowattError::timeout("slow").is_transient());
        assert!(OctowattError::upstream(502, "bad gateway").is_transient());
        assert!(OctowattError::upstream(429, "slow down").is_transient());
        assert!(!OctowattError::upstream(404, "not found").is_transient());
        assert!(!OctowattError::auth("bad key").is_transient());
        assert!(!OctowattError::serialization("missing field").is_transient());
    }
}
