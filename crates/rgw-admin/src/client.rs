use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response, Url};

use crate::error::{AuthError, CreateKeyError, DeleteKeyError, EndpointError, ListError};
use crate::model::{AuthRequest, AuthResponse, CreateKeyRequest, Credential, KEY_TYPE_S3};
use crate::tracerr;

/// Media type pinning the administrative API version. The response schemas are version
/// dependent so this is never negotiated.
pub const API_VERSION: &str = "application/vnd.ceph.api.v1.0+json";

/// Timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Base URL of the administrative API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parse and validate an endpoint URL.
    ///
    /// # Errors
    ///
    /// * `EndpointError::Parse` if the value is not a URL.
    /// * `EndpointError::Scheme` if the scheme is not `http` or `https`.
    /// * `EndpointError::Credentials` if the URL has a username or password.
    pub fn parse(endpoint: &str) -> Result<Self, EndpointError> {
        let mut url = Url::parse(endpoint.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EndpointError::Scheme(url.scheme().to_string()));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(EndpointError::Credentials);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self(url))
    }

    /// The underlying URL.
    #[must_use]
    pub const fn as_url(&self) -> &Url {
        &self.0
    }

    // Append path segments to the base URL. Segments are percent-encoded.
    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.0.clone();
        // http(s) URLs can always be a base
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An authenticated session against the administrative API.
///
/// A session only exists with a non-empty bearer token. It is meant to live for a single
/// lifecycle call: create it, make one or two requests, drop it.
pub struct Session {
    endpoint: Endpoint,
    token: String,
    http_client: Client,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Exchange a username and password for a bearer token.
    ///
    /// The HTTP status of the response is not checked: the dashboard answers a rejected login
    /// with a body that carries no token, which is reported as `AuthError::EmptyToken`.
    ///
    /// # Errors
    ///
    /// * `AuthError::Transport` if the request cannot be made or times out.
    /// * `AuthError::Decode` if the response body is not a valid auth response.
    /// * `AuthError::EmptyToken` if the response carries no token.
    pub async fn authenticate(
        endpoint: &Endpoint, username: &str, password: &str,
    ) -> Result<Self, AuthError> {
        let http_client = http_client().map_err(AuthError::Transport)?;
        let url = endpoint.join(&["api", "auth"]);
        tracing::debug!(path = url.path(), "authenticating");

        let body = AuthRequest { username, password };
        let res = http_client.post(url).json(&body).send().await.map_err(AuthError::Transport)?;
        let status = res.status().as_u16();
        let bytes = res.bytes().await.map_err(AuthError::Transport)?;

        let auth: AuthResponse = serde_json::from_slice(&bytes).map_err(AuthError::Decode)?;
        let token = auth.token.unwrap_or_default();
        if token.is_empty() {
            tracerr!(AuthError::EmptyToken, "no token in auth response (status {status})");
        }

        Ok(Self {
            endpoint: endpoint.clone(),
            token,
            http_client,
        })
    }

    /// Endpoint this session was established against.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// List RGW identity names in the order returned by the server. No pagination is
    /// performed.
    ///
    /// # Errors
    ///
    /// * `ListError::Transport` if the request cannot be made or times out.
    /// * `ListError::Decode` if the response body is not a list of names.
    pub async fn list_identities(&self) -> Result<Vec<String>, ListError> {
        let url = self.endpoint.join(&["api", "rgw", "user"]);
        let res = self
            .http_client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ListError::Transport)?;
        let bytes = res.bytes().await.map_err(ListError::Transport)?;
        serde_json::from_slice(&bytes).map_err(ListError::Decode)
    }

    /// Add an S3 key to an identity.
    ///
    /// The API answers with every key the identity owns, so the new key is picked out of the
    /// list by its secret key.
    ///
    /// # Arguments
    ///
    /// * `identity` - RGW user the key is added to.
    /// * `access_key` - Requested access key. `None` lets the cluster generate one.
    /// * `secret_key` - Secret key for the new credential.
    ///
    /// # Errors
    ///
    /// * `CreateKeyError::Transport` if the request cannot be made or times out.
    /// * `CreateKeyError::UnexpectedStatus` for any status other than 200 or 201.
    /// * `CreateKeyError::Decode` if the response body is not a list of keys.
    /// * `CreateKeyError::NotFoundInResponse` if no listed key has `secret_key`.
    pub async fn create_key(
        &self, identity: &str, access_key: Option<&str>, secret_key: &str,
    ) -> Result<Credential, CreateKeyError> {
        let url = self.endpoint.join(&["api", "rgw", "user", identity, "key"]);
        let body = CreateKeyRequest {
            access_key: access_key.unwrap_or_default(),
            secret_key,
            key_type: KEY_TYPE_S3,
        };
        let res = self
            .http_client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(CreateKeyError::Transport)?;

        let code = res.status().as_u16();
        if !matches!(code, 200 | 201) {
            let body = body_text(res).await.map_err(CreateKeyError::Transport)?;
            tracerr!(
                CreateKeyError::UnexpectedStatus { code, body },
                "create key for {identity} returned status {code}"
            );
        }

        let bytes = res.bytes().await.map_err(CreateKeyError::Transport)?;
        let keys: Vec<Credential> =
            serde_json::from_slice(&bytes).map_err(CreateKeyError::Decode)?;
        let count = keys.len();

        match keys.into_iter().find(|key| key.secret_key == secret_key) {
            Some(key) => {
                tracing::debug!(identity, access_key = %key.access_key, "key created");
                Ok(key)
            }
            None => tracerr!(
                CreateKeyError::NotFoundInResponse,
                "none of {count} keys returned for {identity} matched the new key"
            ),
        }
    }

    /// Remove an S3 key from an identity.
    ///
    /// # Errors
    ///
    /// * `DeleteKeyError::Transport` if the request cannot be made or times out.
    /// * `DeleteKeyError::UnexpectedStatus` for any status other than 202 or 204.
    pub async fn delete_key(&self, identity: &str, access_key: &str) -> Result<(), DeleteKeyError> {
        let mut url = self.endpoint.join(&["api", "rgw", "user", identity, "key"]);
        url.query_pairs_mut().append_pair("access_key", access_key);

        let res = self
            .http_client
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(DeleteKeyError::Transport)?;

        let code = res.status().as_u16();
        if !matches!(code, 202 | 204) {
            let body = body_text(res).await.map_err(DeleteKeyError::Transport)?;
            tracerr!(
                DeleteKeyError::UnexpectedStatus { code, body },
                "delete key {access_key} from {identity} returned status {code}"
            );
        }

        tracing::debug!(identity, access_key, "key deleted");
        Ok(())
    }
}

// Reusable request settings: pinned API version and timeout.
fn http_client() -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(API_VERSION));
    Client::builder().default_headers(headers).timeout(REQUEST_TIMEOUT).build()
}

// Raw body of an error response, kept for diagnostics.
async fn body_text(res: Response) -> reqwest::Result<String> {
    res.text().await
}
