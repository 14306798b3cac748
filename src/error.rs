//! # Lifecycle Errors
//!
//! Errors returned to the authority by lifecycle operations. Remote failures are carried
//! unchanged from the administrative API client.

use std::collections::HashMap;

use rgw_admin::{AuthError, CreateKeyError, DeleteKeyError, ListError};
use thiserror::Error;

use crate::redact::redact;

/// Result type for lifecycle operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Lifecycle operation errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration key is absent.
    #[error("missing config key: {0}")]
    MissingConfigKey(&'static str),

    /// A configuration value has the wrong JSON type.
    #[error("config key {key} must be a {expected}")]
    InvalidConfigType {
        /// Canonical key name.
        key: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// A configuration value has the right type but cannot be used.
    #[error("invalid value for config key {key}: {reason}")]
    InvalidConfigValue {
        /// Canonical key name.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The request cannot be acted on as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider has not been successfully initialized.
    #[error("provider is {0}, not ready")]
    NotReady(&'static str),

    /// The provider has been closed.
    #[error("provider is closed")]
    Closed,

    /// The configured identity does not exist on the cluster.
    #[error("identity {0} not found")]
    UnknownIdentity(String),

    /// Authentication against the administrative API failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Listing identities failed.
    #[error("unable to list identities: {0}")]
    ListIdentities(#[from] ListError),

    /// Creating a key failed.
    #[error("unable to create key: {0}")]
    CreateKey(#[from] CreateKeyError),

    /// Deleting a key failed.
    #[error("unable to delete key: {0}")]
    DeleteKey(#[from] DeleteKeyError),

    /// An error whose message has been scrubbed of secret values.
    #[error("{message}")]
    Redacted {
        /// Code of the original error.
        code: &'static str,
        /// Scrubbed message of the original error.
        message: String,
    },
}

impl Error {
    /// Stable, machine readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingConfigKey(_) => "missing_config_key",
            Self::InvalidConfigType { .. } => "invalid_config_type",
            Self::InvalidConfigValue { .. } => "invalid_config_value",
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotReady(_) => "not_ready",
            Self::Closed => "closed",
            Self::UnknownIdentity(_) => "unknown_identity",
            Self::Auth(AuthError::EmptyToken) => "empty_token",
            Self::Auth(AuthError::Transport(_))
            | Self::ListIdentities(ListError::Transport(_))
            | Self::CreateKey(CreateKeyError::Transport(_))
            | Self::DeleteKey(DeleteKeyError::Transport(_)) => "transport_error",
            Self::Auth(AuthError::Decode(_))
            | Self::ListIdentities(ListError::Decode(_))
            | Self::CreateKey(CreateKeyError::Decode(_)) => "decode_error",
            Self::CreateKey(CreateKeyError::UnexpectedStatus { .. })
            | Self::DeleteKey(DeleteKeyError::UnexpectedStatus { .. }) => "unexpected_status",
            Self::CreateKey(CreateKeyError::NotFoundInResponse) => "not_found_in_response",
            Self::Redacted { code, .. } => *code,
        }
    }

    /// Error in `OAuth2` style JSON: `{"error": code, "error_description": message}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.code(),
            "error_description": self.to_string(),
        })
    }

    /// Replace the error with one whose message has every secret value replaced by its
    /// placeholder. The error code is kept.
    #[must_use]
    pub fn redact(self, secrets: &HashMap<String, String>) -> Self {
        let message = redact(&self.to_string(), secrets);
        Self::Redacted {
            code: self.code(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn remote_error_codes() {
        let err: Error = AuthError::EmptyToken.into();
        assert_eq!(err.code(), "empty_token");

        let err: Error = CreateKeyError::NotFoundInResponse.into();
        assert_eq!(err.code(), "not_found_in_response");

        let err: Error = DeleteKeyError::UnexpectedStatus {
            code: 404,
            body: "NoSuchKey".into(),
        }
        .into();
        assert_eq!(err.code(), "unexpected_status");
        assert_eq!(
            err.to_string(),
            "unable to delete key: delete key returned unexpected status 404: NoSuchKey"
        );
    }

    #[test]
    fn config_error_json() {
        let err = Error::MissingConfigKey("endpoint");
        assert_eq!(
            err.to_json(),
            json!({"error": "missing_config_key", "error_description": "missing config key: endpoint"})
        );
    }

    #[test]
    fn redact_keeps_code() {
        let err: Error = CreateKeyError::UnexpectedStatus {
            code: 500,
            body: "bad secret hunter2".into(),
        }
        .into();
        let secrets = HashMap::from([("hunter2".to_string(), "[password]".to_string())]);

        let err = err.redact(&secrets);
        assert_eq!(err.code(), "unexpected_status");
        assert_eq!(
            err.to_string(),
            "unable to create key: create key returned unexpected status 500: bad secret [password]"
        );
    }
}
