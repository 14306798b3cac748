//! # Host Adapter
//!
//! Serves provider instances to the authority over a line-delimited JSON stream. Each line
//! is one request addressed to a named instance:
//!
//! ```json
//! {"id": 1, "instance": "a", "op": "new_user", "password": "..."}
//! ```
//!
//! and is answered by one line carrying either a `result` or an `error`:
//!
//! ```json
//! {"id": 1, "instance": "a", "result": {"username": "AK1"}}
//! {"id": 1, "instance": "a", "error": {"error": "not_ready", "error_description": "..."}}
//! ```
//!
//! Requests run concurrently, so replies may arrive out of order.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::provider::{
    DeleteUserRequest, Factory, InitializeRequest, Lifecycle, NewUserRequest, UpdateUserRequest,
};

/// A lifecycle operation and its arguments.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Configure the instance.
    Initialize(InitializeRequest),

    /// Issue a credential.
    NewUser(NewUserRequest),

    /// Change a credential.
    UpdateUser(UpdateUserRequest),

    /// Revoke a credential.
    DeleteUser(DeleteUserRequest),

    /// Report the provider type.
    Type,

    /// Close and forget the instance.
    Close,
}

impl Operation {
    const fn name(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::NewUser(_) => "new_user",
            Self::UpdateUser(_) => "update_user",
            Self::DeleteUser(_) => "delete_user",
            Self::Type => "type",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Header {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    instance: String,
}

#[derive(Debug, Serialize)]
struct Reply {
    id: u64,
    instance: String,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Result(Value),
    Error(Value),
}

/// Provider instances keyed by the name the authority gives them.
pub struct Multiplexer<F: Factory> {
    factory: F,
    instances: DashMap<String, Arc<RwLock<F::Provider>>>,
}

impl<F: Factory> Multiplexer<F> {
    /// Create an empty multiplexer that builds instances with `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            instances: DashMap::new(),
        }
    }

    /// Number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether there are no live instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    // Registered instance for `name`, creating and registering one if absent. The flag is
    // set when the instance is new.
    fn register(&self, name: &str) -> Result<(Arc<RwLock<F::Provider>>, bool)> {
        match self.instances.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok((Arc::clone(entry.get()), false)),
            Entry::Vacant(entry) => {
                let provider = Arc::new(RwLock::new(self.factory.create()?));
                entry.insert(Arc::clone(&provider));
                Ok((provider, true))
            }
        }
    }

    fn is_registered(&self, name: &str, provider: &Arc<RwLock<F::Provider>>) -> bool {
        self.instances.get(name).is_some_and(|p| Arc::ptr_eq(&p, provider))
    }

    // Registered instance for `name`, or an unregistered fresh one that is dropped after the
    // call.
    fn lookup(&self, name: &str) -> Result<Arc<RwLock<F::Provider>>> {
        if let Some(provider) = self.instances.get(name) {
            return Ok(Arc::clone(&provider));
        }
        Ok(Arc::new(RwLock::new(self.factory.create()?)))
    }

    /// Run `op` against the named instance.
    ///
    /// Only a successful `initialize` keeps an instance; other operations on an unknown name
    /// run against a fresh, uninitialized provider that is not retained.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the provider, or by the factory when the instance
    /// cannot be created.
    pub async fn dispatch(&self, instance: &str, op: Operation) -> Result<Value> {
        match op {
            Operation::Initialize(req) => loop {
                let (provider, created) = self.register(instance)?;
                let mut guard = provider.write().await;
                // a failed initialize unregistered it while this call waited for the lock
                if !self.is_registered(instance, &provider) {
                    continue;
                }
                let result = guard.initialize(req).await;
                if result.is_err() && created {
                    self.instances.remove_if(instance, |_, p| Arc::ptr_eq(p, &provider));
                }
                return result.map(|resp| json!({"config": resp.config}));
            },
            Operation::NewUser(req) => {
                let provider = self.lookup(instance)?;
                let resp = provider.read().await.new_user(req).await?;
                Ok(json!({"username": resp.username}))
            }
            Operation::UpdateUser(req) => {
                let provider = self.lookup(instance)?;
                provider.read().await.update_user(req).await?;
                Ok(json!({}))
            }
            Operation::DeleteUser(req) => {
                let provider = self.lookup(instance)?;
                provider.read().await.delete_user(req).await?;
                Ok(json!({}))
            }
            Operation::Type => {
                let provider = self.lookup(instance)?;
                let kind = provider.read().await.kind();
                Ok(json!({"type": kind}))
            }
            Operation::Close => {
                if let Some((_, provider)) = self.instances.remove(instance) {
                    provider.write().await.close()?;
                }
                Ok(json!({}))
            }
        }
    }

    async fn handle(&self, header: Header, op: Operation) -> Reply {
        let name = op.name();
        tracing::debug!(id = header.id, instance = %header.instance, op = name, "request");

        let outcome = match self.dispatch(&header.instance, op).await {
            Ok(result) => Outcome::Result(result),
            Err(e) => {
                tracing::warn!(id = header.id, instance = %header.instance, op = name, error = e.code(), "request failed");
                Outcome::Error(e.to_json())
            }
        };
        Reply {
            id: header.id,
            instance: header.instance,
            outcome,
        }
    }
}

// Error messages never quote request content, which may hold secrets.
fn parse(line: &str) -> Result<(Header, Operation), Reply> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        let reason = format!("malformed request at line {} column {}", e.line(), e.column());
        invalid(Header::default(), reason)
    })?;
    let header = Header::deserialize(&value).unwrap_or_default();
    match Operation::deserialize(&value) {
        Ok(op) => Ok((header, op)),
        Err(_) => {
            let reason = match value.get("op").and_then(Value::as_str) {
                Some(op) => format!("malformed {op} request"),
                None => "missing operation".to_string(),
            };
            Err(invalid(header, reason))
        }
    }
}

fn invalid(header: Header, reason: String) -> Reply {
    tracing::warn!(id = header.id, "{reason}");
    Reply {
        id: header.id,
        instance: header.instance,
        outcome: Outcome::Error(Error::InvalidRequest(reason).to_json()),
    }
}

/// Read requests from `reader` until end of input, answering each on `writer`.
///
/// Requests are processed concurrently. On end of input, requests already started run to
/// completion and their replies are written before returning.
///
/// # Errors
///
/// Returns an error if reading a request or writing a reply fails.
pub async fn serve<F, R, W>(factory: F, reader: R, writer: W) -> anyhow::Result<()>
where
    F: Factory + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mux = Arc::new(Multiplexer::new(factory));
    let (tx, rx) = mpsc::unbounded_channel();
    let write_task = tokio::spawn(write_replies(rx, writer));

    let mut tasks = JoinSet::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        while tasks.try_join_next().is_some() {}
        if line.trim().is_empty() {
            continue;
        }

        let (header, op) = match parse(&line) {
            Ok(request) => request,
            Err(reply) => {
                let _ = tx.send(reply);
                continue;
            }
        };
        let mux = Arc::clone(&mux);
        let tx = tx.clone();
        tasks.spawn(async move {
            let reply = mux.handle(header, op).await;
            let _ = tx.send(reply);
        });
    }

    tracing::debug!(pending = tasks.len(), "end of input");
    while tasks.join_next().await.is_some() {}
    drop(tx);
    write_task.await?
}

async fn write_replies<W>(mut rx: mpsc::UnboundedReceiver<Reply>, mut writer: W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let mut line = serde_json::to_vec(&reply)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}
