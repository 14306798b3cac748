//! # Provider Traits
//!
//! The contract between the secrets authority and a credential provider. The authority asks a
//! [`Factory`] for as many provider instances as it needs and drives each one through the
//! [`Lifecycle`] operations.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::controller::Controller;
use crate::error::Result;
use crate::redact::Sanitized;

/// Lifecycle operations a credential provider implements for the authority.
///
/// `initialize` and `close` need exclusive access. The remaining operations take `&self` and
/// may run concurrently on one instance.
pub trait Lifecycle: Send + Sync {
    /// Accept configuration and check that it can be used.
    fn initialize(
        &mut self, req: InitializeRequest,
    ) -> impl Future<Output = Result<InitializeResponse>> + Send;

    /// Issue a new credential with the supplied secret.
    fn new_user(&self, req: NewUserRequest) -> impl Future<Output = Result<NewUserResponse>> + Send;

    /// Change an existing credential.
    fn update_user(
        &self, req: UpdateUserRequest,
    ) -> impl Future<Output = Result<UpdateUserResponse>> + Send;

    /// Revoke a credential.
    fn delete_user(
        &self, req: DeleteUserRequest,
    ) -> impl Future<Output = Result<DeleteUserResponse>> + Send;

    /// Name of this kind of provider.
    fn kind(&self) -> &'static str;

    /// Release the provider. Further operations fail.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn close(&mut self) -> Result<()>;

    /// Live secret values mapped to the placeholder that should replace them in any output.
    /// Computed on every call.
    fn secret_values(&self) -> HashMap<String, String>;
}

/// Produces provider instances on demand.
pub trait Factory: Send + Sync {
    /// Provider type created.
    type Provider: Lifecycle + 'static;

    /// Create a new, uninitialized provider.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn create(&self) -> Result<Self::Provider>;
}

/// Creates Ceph S3 providers wrapped in the error sanitizer.
#[derive(Clone, Copy, Debug, Default)]
pub struct CephFactory;

impl Factory for CephFactory {
    type Provider = Sanitized<Controller>;

    fn create(&self) -> Result<Self::Provider> {
        Ok(Sanitized::new(Controller::new()))
    }
}

/// Configuration pushed by the authority.
#[derive(Clone, Default, Deserialize)]
pub struct InitializeRequest {
    /// Provider configuration. See [`crate::Config`] for recognised keys.
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl fmt::Debug for InitializeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializeRequest").field("config", &config_keys(&self.config)).finish()
    }
}

/// Configuration the authority should persist for this provider.
#[derive(Clone, Default)]
pub struct InitializeResponse {
    /// The configuration as supplied.
    pub config: Map<String, Value>,
}

impl fmt::Debug for InitializeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializeResponse").field("config", &config_keys(&self.config)).finish()
    }
}

// Config maps hold the admin password, so only keys are printed.
fn config_keys(config: &Map<String, Value>) -> Vec<&str> {
    config.keys().map(String::as_str).collect()
}

/// Display information the authority attaches to a new credential.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UsernameMetadata {
    /// Display name of the requesting token or entity.
    #[serde(default)]
    pub display_name: String,

    /// Role the credential is issued for.
    #[serde(default)]
    pub role_name: String,
}

/// Request for a new credential.
#[derive(Clone, Default, Deserialize)]
pub struct NewUserRequest {
    /// Display metadata.
    #[serde(default)]
    pub username_config: UsernameMetadata,

    /// Secret key for the new credential, generated by the authority.
    pub password: String,

    /// Creation statements configured on the role.
    #[serde(default)]
    pub statements: Vec<String>,

    /// When the authority will revoke the credential.
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for NewUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUserRequest")
            .field("username_config", &self.username_config)
            .field("password", &"[redacted]")
            .field("statements", &self.statements)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A newly issued credential.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewUserResponse {
    /// Credential identifier. For S3 credentials this is the access key.
    pub username: String,
}

/// Request to change an existing credential.
#[derive(Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// Credential identifier (access key).
    pub username: String,

    /// New secret, if rotation was requested.
    #[serde(default)]
    pub password: Option<String>,

    /// New expiry, if extension was requested.
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for UpdateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUserRequest")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Outcome of an update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateUserResponse;

/// Request to revoke a credential.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeleteUserRequest {
    /// Credential identifier. For S3 credentials this is the access key to remove.
    pub username: String,

    /// Revocation statements configured on the role.
    #[serde(default)]
    pub statements: Vec<String>,
}

/// Outcome of a revocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteUserResponse;
