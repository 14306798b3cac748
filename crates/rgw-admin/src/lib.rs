//! # Ceph Dashboard Administrative API Client
//!
//! Session establishment (username/password to bearer token) and the RGW identity and S3 key
//! operations needed to issue and revoke object storage credentials.
//!
//! Every request carries the pinned API version media type and a fixed timeout of
//! [`REQUEST_TIMEOUT`].

mod client;
mod error;
mod model;

pub use client::{Endpoint, Session, API_VERSION, REQUEST_TIMEOUT};
pub use error::{AuthError, CreateKeyError, DeleteKeyError, EndpointError, ListError};
pub use model::{Credential, KEY_TYPE_S3};
