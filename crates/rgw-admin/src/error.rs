//! # Administrative API Errors
//!
//! One error type per remote operation so callers can tell a transport
//! failure from a protocol violation without parsing messages.

use thiserror::Error;

/// Log an error with `tracing` and return it from the enclosing function.
///
/// # Example
/// ```
/// use rgw_admin::{tracerr, AuthError};
///
/// fn no_token() -> Result<(), AuthError> {
///     tracerr!(AuthError::EmptyToken)
/// }
///
/// fn with_msg() -> Result<(), AuthError> {
///     tracerr!(AuthError::EmptyToken, "auth response for {} had no token", "admin")
/// }
/// ```
#[macro_export]
macro_rules! tracerr {
    // with context
    ($err:expr, $($msg:tt)*) => {
        {
        tracing::error!($($msg)*);
        return Err($err.into());
        }
    };
    // no context
    ($err:expr) => {
        {
        let err = $err;
        tracing::error!("{err}");
        return Err(err.into());
        }
    }
}

/// Endpoint URL could not be used as an administrative API base.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Not a URL.
    #[error("invalid endpoint URL: {0}")]
    Parse(#[from] url::ParseError),

    /// Only `http` and `https` are supported.
    #[error("unsupported endpoint scheme: {0}")]
    Scheme(String),

    /// The URL carries a username or password. Requests authenticate with a bearer token
    /// only.
    #[error("endpoint URL must not contain credentials")]
    Credentials,
}

/// Session establishment failed.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network, timeout or body read failure.
    #[error("auth request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Response body was not a valid auth response.
    #[error("unable to decode auth response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Response parsed but carried no token.
    #[error("auth response contained an empty token")]
    EmptyToken,
}

/// Listing RGW identities failed.
#[derive(Error, Debug)]
pub enum ListError {
    /// Network, timeout or body read failure.
    #[error("list identities request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Response body was not a list of identity names.
    #[error("unable to decode identity list: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Creating a key failed.
#[derive(Error, Debug)]
pub enum CreateKeyError {
    /// Network, timeout or body read failure.
    #[error("create key request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Response body was not a list of keys.
    #[error("unable to decode key list: {0}")]
    Decode(#[source] serde_json::Error),

    /// Status outside 200/201. `body` is the raw response body.
    #[error("create key returned unexpected status {code}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        code: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// No key in the response matched the secret key sent.
    #[error("created key not found in key list response")]
    NotFoundInResponse,
}

/// Deleting a key failed.
#[derive(Error, Debug)]
pub enum DeleteKeyError {
    /// Network, timeout or body read failure.
    #[error("delete key request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Status outside 202/204. `body` is the raw response body.
    #[error("delete key returned unexpected status {code}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        code: u16,
        /// Response body, verbatim.
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_macro() -> Result<(), CreateKeyError> {
        tracerr!(CreateKeyError::NotFoundInResponse)
    }

    fn run_macro_with_msg() -> Result<(), DeleteKeyError> {
        tracerr!(
            DeleteKeyError::UnexpectedStatus {
                code: 404,
                body: "NoSuchKey".into()
            },
            "delete failed with {}",
            404
        )
    }

    #[test]
    fn macro_returns_error() {
        let Err(e) = run_macro() else {
            panic!("expected error");
        };
        assert!(matches!(e, CreateKeyError::NotFoundInResponse));

        let Err(e) = run_macro_with_msg() else {
            panic!("expected error");
        };
        assert_eq!(e.to_string(), "delete key returned unexpected status 404: NoSuchKey");
    }

    #[test]
    fn endpoint_error_display() {
        let err = EndpointError::Scheme("ftp".into());
        assert_eq!(err.to_string(), "unsupported endpoint scheme: ftp");
        assert_eq!(
            EndpointError::Credentials.to_string(),
            "endpoint URL must not contain credentials"
        );
    }
}
