//! # Secret Redaction
//!
//! Errors leave the provider only after every live secret value in their message has been
//! replaced with its placeholder. [`Sanitized`] applies this to any [`Lifecycle`]
//! implementation.

use std::collections::HashMap;

use crate::error::Result;
use crate::provider::{
    DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse, Lifecycle,
    NewUserRequest, NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};

/// Replace every occurrence of each secret in `message` with its placeholder.
///
/// Longer secrets are replaced first so a secret containing another is not left partially
/// exposed. Empty secrets are ignored.
#[must_use]
pub fn redact(message: &str, secrets: &HashMap<String, String>) -> String {
    let mut ordered: Vec<(&String, &String)> =
        secrets.iter().filter(|(secret, _)| !secret.is_empty()).collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = message.to_string();
    for (secret, placeholder) in ordered {
        if out.contains(secret.as_str()) {
            out = out.replace(secret.as_str(), placeholder);
        }
    }
    out
}

/// Wraps a provider so that errors it returns are scrubbed of its secret values.
///
/// Secrets are read from the inner provider after each call, so values learned during the
/// call (e.g. from configuration) are covered.
#[derive(Debug, Default)]
pub struct Sanitized<P> {
    inner: P,
}

impl<P> Sanitized<P> {
    /// Wrap `inner`.
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }

    /// The wrapped provider.
    pub const fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Lifecycle> Sanitized<P> {
    fn scrub<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| e.redact(&self.inner.secret_values()))
    }
}

impl<P: Lifecycle> Lifecycle for Sanitized<P> {
    async fn initialize(&mut self, req: InitializeRequest) -> Result<InitializeResponse> {
        let result = self.inner.initialize(req).await;
        self.scrub(result)
    }

    async fn new_user(&self, req: NewUserRequest) -> Result<NewUserResponse> {
        let result = self.inner.new_user(req).await;
        self.scrub(result)
    }

    async fn update_user(&self, req: UpdateUserRequest) -> Result<UpdateUserResponse> {
        let result = self.inner.update_user(req).await;
        self.scrub(result)
    }

    async fn delete_user(&self, req: DeleteUserRequest) -> Result<DeleteUserResponse> {
        let result = self.inner.delete_user(req).await;
        self.scrub(result)
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    fn close(&mut self) -> Result<()> {
        let result = self.inner.close();
        self.scrub(result)
    }

    fn secret_values(&self) -> HashMap<String, String> {
        self.inner.secret_values()
    }
}
