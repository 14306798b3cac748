//! # Ceph S3 Credentials
//!
//! A dynamic credential provider that issues and revokes S3 access keys on a Ceph RGW
//! identity. The secrets authority generates each secret key; the provider registers it
//! with the cluster and hands back the access key the cluster assigns.
//!
//! Providers are created through [`CephFactory`] and driven through the [`Lifecycle`]
//! operations, either directly or over a line-delimited JSON stream with [`serve`].

mod config;
mod controller;
mod error;
mod provider;
mod redact;
mod serve;

pub use rgw_admin as admin;

pub use self::config::Config;
pub use self::controller::{Controller, PASSWORD_PLACEHOLDER, PROVIDER_TYPE};
pub use self::error::{Error, Result};
pub use self::provider::*;
pub use self::redact::{redact, Sanitized};
pub use self::serve::{serve, Multiplexer, Operation};
