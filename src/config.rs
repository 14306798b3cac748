//! # Provider Configuration
//!
//! The authority supplies configuration once, as a JSON object. It is validated and copied
//! into [`Config`] so later changes to the authority's map have no effect.
//!
//! | Key               | Aliases         | Required | Type                       |
//! |-------------------|-----------------|----------|----------------------------|
//! | `endpoint`        | `ceph_url`      | yes      | `http(s)` URL              |
//! | `admin-username`  | `ceph_username` | yes      | string                     |
//! | `admin-password`  | `ceph_password` | yes      | string                     |
//! | `rgw-identity`    | `ceph_identity` | yes      | string                     |
//! | `verify-identity` |                 | no       | bool or `"true"`/`"false"` |

use std::fmt;

use rgw_admin::Endpoint;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// Accepted key names, canonical name first.
const ENDPOINT: &[&str] = &["endpoint", "ceph_url"];
const USERNAME: &[&str] = &["admin-username", "ceph_username"];
const PASSWORD: &[&str] = &["admin-password", "ceph_password"];
const IDENTITY: &[&str] = &["rgw-identity", "ceph_identity"];
const VERIFY_IDENTITY: &[&str] = &["verify-identity"];

/// Validated provider configuration.
#[derive(Clone)]
pub struct Config {
    /// Administrative API base URL.
    pub endpoint: Endpoint,

    /// Dashboard admin user.
    pub username: String,

    /// Dashboard admin password.
    pub password: String,

    /// RGW identity every issued key belongs to.
    pub identity: String,

    /// Check during initialization that `identity` exists on the cluster.
    pub verify_identity: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint.to_string())
            .field("username", &self.username)
            .field("password", &"[password]")
            .field("identity", &self.identity)
            .field("verify_identity", &self.verify_identity)
            .finish()
    }
}

impl Config {
    /// Build a configuration from the authority's key/value map.
    ///
    /// # Errors
    ///
    /// * `Error::MissingConfigKey` if a required key (or all of its aliases) is absent.
    /// * `Error::InvalidConfigType` if a value has the wrong JSON type.
    /// * `Error::InvalidConfigValue` if a value is empty or the endpoint is not a usable URL.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let endpoint = required_trimmed(map, ENDPOINT)?;
        let endpoint = Endpoint::parse(endpoint).map_err(|e| Error::InvalidConfigValue {
            key: ENDPOINT[0],
            reason: e.to_string(),
        })?;

        Ok(Self {
            endpoint,
            username: required_str(map, USERNAME)?.to_string(),
            password: required_str(map, PASSWORD)?.to_string(),
            identity: required_trimmed(map, IDENTITY)?.to_string(),
            verify_identity: optional_bool(map, VERIFY_IDENTITY)?.unwrap_or(false),
        })
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key)).filter(|value| !value.is_null())
}

// Credentials are taken verbatim; only the empty string is rejected.
fn required_str<'a>(map: &'a Map<String, Value>, keys: &[&'static str]) -> Result<&'a str> {
    let key = keys[0];
    match lookup(map, keys) {
        None => Err(Error::MissingConfigKey(key)),
        Some(Value::String(value)) if value.is_empty() => Err(empty(key)),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(Error::InvalidConfigType {
            key,
            expected: "string",
        }),
    }
}

// Surrounding whitespace is dropped and a blank value is rejected.
fn required_trimmed<'a>(map: &'a Map<String, Value>, keys: &[&'static str]) -> Result<&'a str> {
    let value = required_str(map, keys)?.trim();
    if value.is_empty() {
        return Err(empty(keys[0]));
    }
    Ok(value)
}

fn empty(key: &'static str) -> Error {
    Error::InvalidConfigValue {
        key,
        reason: "must not be empty".into(),
    }
}

fn optional_bool(map: &Map<String, Value>, keys: &[&'static str]) -> Result<Option<bool>> {
    let key = keys[0];
    match lookup(map, keys) {
        None => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(Value::String(value)) => match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(Error::InvalidConfigValue {
                key,
                reason: "expected true or false".into(),
            }),
        },
        Some(_) => Err(Error::InvalidConfigType {
            key,
            expected: "boolean",
        }),
    }
}
