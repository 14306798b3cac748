//! # Mock Administrative API
//!
//! A small axum server standing in for the Ceph dashboard API. Each test starts its own
//! instance on an ephemeral port, configures the replies it wants and inspects the requests
//! that were made.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};

/// Token returned by a freshly started mock.
pub const DEFAULT_TOKEN: &str = "T1";

/// Canned reply: status code and raw body.
#[derive(Clone, Debug)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl Reply {
    /// Reply with a raw body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Reply with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

/// A request received by the mock.
#[derive(Clone, Debug)]
pub struct Recorded {
    /// HTTP method.
    pub method: Method,
    /// Request path, still percent-encoded.
    pub path: String,
    /// Raw query string.
    pub query: Option<String>,
    /// `Accept` header.
    pub accept: Option<String>,
    /// `Authorization` header.
    pub authorization: Option<String>,
    /// Decoded JSON body, if any.
    pub body: Option<Value>,
}

struct Inner {
    auth: Reply,
    identities: Reply,
    // `None` echoes the request's secret key back with a generated access key.
    create_key: Option<Reply>,
    delete_key: Reply,
    generated: usize,
    requests: Vec<Recorded>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            auth: Reply::json(201, &json!({ "token": DEFAULT_TOKEN })),
            identities: Reply::json(200, &json!(["testing"])),
            create_key: None,
            delete_key: Reply::new(204, ""),
            generated: 0,
            requests: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<Inner>>;

/// Handle to a running mock server.
#[derive(Clone)]
pub struct MockAdmin {
    addr: SocketAddr,
    inner: Shared,
}

impl MockAdmin {
    /// Start a mock server on `127.0.0.1` with an ephemeral port.
    ///
    /// # Panics
    ///
    /// If the listener cannot be bound.
    pub async fn start() -> Self {
        let inner: Shared = Arc::new(Mutex::new(Inner::default()));
        let app = Router::new()
            .route("/api/auth", post(auth))
            .route("/api/rgw/user", get(identities))
            .route("/api/rgw/user/{uid}/key", post(create_key).delete(delete_key))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server failed");
        });

        Self { addr, inner }
    }

    /// Base URL to use as the administrative endpoint.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Reply to `POST /api/auth` with the given token.
    pub fn set_token(&self, token: &str) {
        self.set_auth(Reply::json(201, &json!({ "token": token })));
    }

    /// Reply to `POST /api/auth` verbatim.
    pub fn set_auth(&self, reply: Reply) {
        self.lock().auth = reply;
    }

    /// Reply to `GET /api/rgw/user` with the given names.
    pub fn set_identities(&self, names: &[&str]) {
        self.lock().identities = Reply::json(200, &json!(names));
    }

    /// Reply to `GET /api/rgw/user` verbatim.
    pub fn set_identities_reply(&self, reply: Reply) {
        self.lock().identities = reply;
    }

    /// Reply to `POST /api/rgw/user/{uid}/key` verbatim.
    pub fn set_create_key(&self, reply: Reply) {
        self.lock().create_key = Some(reply);
    }

    /// Reply to `DELETE /api/rgw/user/{uid}/key` verbatim.
    pub fn set_delete_key(&self, reply: Reply) {
        self.lock().delete_key = reply;
    }

    /// All requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.lock().requests.iter().filter(|r| r.path == path).cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock state poisoned")
    }
}

/// An endpoint URL nothing is listening on.
///
/// # Panics
///
/// If a listener cannot be bound to find a free port.
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("should have local address");
    drop(listener);
    format!("http://{addr}")
}

fn record(state: &Shared, method: Method, uri: &Uri, headers: &HeaderMap, body: &Bytes) {
    let header_value = |name: header::HeaderName| {
        headers.get(name).and_then(|v| v.to_str().ok()).map(ToString::to_string)
    };
    let recorded = Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(ToString::to_string),
        accept: header_value(header::ACCEPT),
        authorization: header_value(header::AUTHORIZATION),
        body: serde_json::from_slice(body).ok(),
    };
    state.lock().expect("mock state poisoned").requests.push(recorded);
}

async fn auth(
    State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes,
) -> Response {
    record(&state, method, &uri, &headers, &body);
    let reply = state.lock().expect("mock state poisoned").auth.clone();
    reply.into_response()
}

async fn identities(
    State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, &headers, &Bytes::new());
    let reply = state.lock().expect("mock state poisoned").identities.clone();
    reply.into_response()
}

async fn create_key(
    State(state): State<Shared>, Path(uid): Path<String>, method: Method, uri: Uri,
    headers: HeaderMap, body: Bytes,
) -> Response {
    record(&state, method, &uri, &headers, &body);
    let mut inner = state.lock().expect("mock state poisoned");
    if let Some(reply) = inner.create_key.clone() {
        return reply.into_response();
    }

    // echo mode: behave like the dashboard and return the identity's keys
    let req: Value = serde_json::from_slice(&body).unwrap_or_default();
    let secret_key = req["secret_key"].as_str().unwrap_or_default().to_string();
    let access_key = match req["access_key"].as_str() {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => {
            inner.generated += 1;
            format!("AK{}", inner.generated)
        }
    };
    let keys = json!([
        { "user": uid, "access_key": "EXISTING", "secret_key": "existing-secret" },
        { "user": uid, "access_key": access_key, "secret_key": secret_key },
    ]);
    drop(inner);
    Reply::json(201, &keys).into_response()
}

async fn delete_key(
    State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, &headers, &Bytes::new());
    let reply = state.lock().expect("mock state poisoned").delete_key.clone();
    reply.into_response()
}
