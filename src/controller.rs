//! # Credential Lifecycle Controller
//!
//! Issues and revokes S3 keys on a single RGW identity. Every operation authenticates afresh
//! and makes exactly one mutating call, so there is nothing to roll back and no session to
//! go stale between calls.

use std::collections::HashMap;

use rgw_admin::Session;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{
    DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse, Lifecycle,
    NewUserRequest, NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};

/// Provider type reported to the authority.
pub const PROVIDER_TYPE: &str = "Ceph-S3";

/// Placeholder substituted for the admin password in any output.
pub const PASSWORD_PLACEHOLDER: &str = "[password]";

#[derive(Default)]
enum State {
    #[default]
    Uninitialized,
    Ready(Config),
    // Config is kept (when it parsed) so its secrets can still be redacted.
    Failed(Option<Config>),
    Closed,
}

impl State {
    const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
            Self::Closed => "closed",
        }
    }
}

/// Ceph S3 credential provider.
#[derive(Default)]
pub struct Controller {
    state: State,
}

impl Controller {
    /// Create an uninitialized controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the controller has been initialized and not closed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// The active configuration, if ready.
    #[must_use]
    pub const fn config(&self) -> Option<&Config> {
        match &self.state {
            State::Ready(config) => Some(config),
            _ => None,
        }
    }

    fn ready(&self) -> Result<&Config> {
        match &self.state {
            State::Ready(config) => Ok(config),
            State::Closed => Err(Error::Closed),
            state => Err(Error::NotReady(state.name())),
        }
    }

    async fn session(config: &Config) -> Result<Session> {
        let session =
            Session::authenticate(&config.endpoint, &config.username, &config.password).await?;
        Ok(session)
    }

    // Connection test run by `initialize`.
    async fn verify(config: &Config) -> Result<()> {
        let session = Self::session(config).await?;
        if config.verify_identity {
            let identities = session.list_identities().await?;
            if !identities.iter().any(|id| id == &config.identity) {
                tracing::warn!(identity = %config.identity, "identity not found on cluster");
                return Err(Error::UnknownIdentity(config.identity.clone()));
            }
        }
        Ok(())
    }
}

impl Lifecycle for Controller {
    async fn initialize(&mut self, req: InitializeRequest) -> Result<InitializeResponse> {
        if matches!(self.state, State::Closed) {
            return Err(Error::Closed);
        }

        let config = match Config::from_map(&req.config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("rejected configuration: {e}");
                self.state = State::Failed(None);
                return Err(e);
            }
        };

        if let Err(e) = Self::verify(&config).await {
            tracing::error!(endpoint = %config.endpoint, error = e.code(), "connection test failed");
            self.state = State::Failed(Some(config));
            return Err(e);
        }

        tracing::info!(endpoint = %config.endpoint, identity = %config.identity, "initialized");
        self.state = State::Ready(config);
        Ok(InitializeResponse { config: req.config })
    }

    async fn new_user(&self, req: NewUserRequest) -> Result<NewUserResponse> {
        let config = self.ready()?;
        if req.password.is_empty() {
            return Err(Error::InvalidRequest("password must not be empty".into()));
        }
        tracing::debug!(
            display_name = %req.username_config.display_name,
            role_name = %req.username_config.role_name,
            statements = req.statements.len(),
            expiration = ?req.expiration,
            "issuing credential"
        );

        let session = Self::session(config).await?;
        let credential = session.create_key(&config.identity, None, &req.password).await?;

        tracing::info!(identity = %config.identity, access_key = %credential.access_key, "issued credential");
        Ok(NewUserResponse {
            username: credential.access_key,
        })
    }

    async fn update_user(&self, req: UpdateUserRequest) -> Result<UpdateUserResponse> {
        // S3 keys cannot be rotated in place; the authority revokes and reissues instead
        tracing::debug!(
            access_key = %req.username,
            password = req.password.is_some(),
            expiration = ?req.expiration,
            "ignoring credential update"
        );
        Ok(UpdateUserResponse)
    }

    async fn delete_user(&self, req: DeleteUserRequest) -> Result<DeleteUserResponse> {
        let config = self.ready()?;
        if req.username.is_empty() {
            return Err(Error::InvalidRequest("username must not be empty".into()));
        }

        let session = Self::session(config).await?;
        session.delete_key(&config.identity, &req.username).await?;

        tracing::info!(identity = %config.identity, access_key = %req.username, "revoked credential");
        Ok(DeleteUserResponse)
    }

    fn kind(&self) -> &'static str {
        PROVIDER_TYPE
    }

    fn close(&mut self) -> Result<()> {
        tracing::debug!(state = self.state.name(), "closing");
        self.state = State::Closed;
        Ok(())
    }

    fn secret_values(&self) -> HashMap<String, String> {
        let mut secrets = HashMap::new();
        if let State::Ready(config) | State::Failed(Some(config)) = &self.state {
            if !config.password.is_empty() {
                secrets.insert(config.password.clone(), PASSWORD_PLACEHOLDER.to_string());
            }
        }
        secrets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn operations_need_initialize() {
        let controller = Controller::new();
        let req = NewUserRequest {
            password: "secretXYZ".into(),
            ..NewUserRequest::default()
        };
        let err = controller.new_user(req).await.expect_err("should not be ready");
        assert!(matches!(err, Error::NotReady("uninitialized")));

        let req = DeleteUserRequest {
            username: "AK1".into(),
            ..DeleteUserRequest::default()
        };
        let err = controller.delete_user(req).await.expect_err("should not be ready");
        assert!(matches!(err, Error::NotReady("uninitialized")));
    }

    #[tokio::test]
    async fn update_is_noop() {
        let controller = Controller::new();
        let req = UpdateUserRequest {
            username: "AK1".into(),
            password: Some("new-secret".into()),
            expiration: None,
        };
        controller.update_user(req).await.expect("should always succeed");
    }

    #[tokio::test]
    async fn closed_is_terminal() {
        let mut controller = Controller::new();
        controller.close().expect("should close");
        controller.close().expect("should close again");

        let err = controller
            .initialize(InitializeRequest::default())
            .await
            .expect_err("should refuse after close");
        assert!(matches!(err, Error::Closed));
        assert!(controller.secret_values().is_empty());
    }

    #[tokio::test]
    async fn bad_config_fails() {
        let mut controller = Controller::new();
        let err = controller
            .initialize(InitializeRequest::default())
            .await
            .expect_err("should reject empty config");
        assert!(matches!(err, Error::MissingConfigKey("endpoint")));
        assert!(!controller.is_ready());

        let req = NewUserRequest {
            password: "secretXYZ".into(),
            ..NewUserRequest::default()
        };
        let err = controller.new_user(req).await.expect_err("should not be ready");
        assert!(matches!(err, Error::NotReady("failed")));
    }
}
