//! Wire types for the administrative API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key type sent with every create key request.
pub const KEY_TYPE_S3: &str = "s3";

// Body of `POST /api/auth`.
#[derive(Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

// Body returned by `POST /api/auth`. Other fields (permissions, pwdExpirationDate, ...) are
// ignored.
#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
}

// Body of `POST /api/rgw/user/{uid}/key`.
#[derive(Serialize)]
pub(crate) struct CreateKeyRequest<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub key_type: &'a str,
}

/// An S3 access key / secret key pair owned by an RGW identity.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Credential {
    /// Access key. Public identifier of the credential.
    pub access_key: String,

    /// Secret key.
    pub secret_key: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"[redacted]")
            .finish()
    }
}
