//! Plugin entry point. Serves Ceph S3 credential providers to the secrets authority over
//! stdin and stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process;

use ceph_s3_credentials::{serve, CephFactory};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Client metadata flags passed by the authority when it launches the plugin.
#[derive(Debug, Parser)]
#[command(name = "ceph-s3-plugin", version, about)]
struct PluginArgs {
    /// CA certificate file
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Directory of CA certificates
    #[arg(long)]
    ca_path: Option<PathBuf>,

    /// Client certificate file
    #[arg(long)]
    client_cert: Option<PathBuf>,

    /// Client key file
    #[arg(long)]
    client_key: Option<PathBuf>,

    /// Skip TLS verification
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    tls_skip_verify: Option<bool>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = real_main().await {
        tracing::error!("plugin exited with error: {err:#}");
        process::exit(1);
    }
}

async fn real_main() -> anyhow::Result<()> {
    let args = PluginArgs::parse_from(normalize(std::env::args()));
    tracing::debug!(?args, "starting");

    let stdin = BufReader::new(tokio::io::stdin());
    serve(CephFactory, stdin, tokio::io::stdout()).await?;

    tracing::info!("input closed, shutting down");
    Ok(())
}

// The authority passes Go style single-dash long flags (`-ca-cert=...`).
fn normalize(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .enumerate()
        .map(|(i, arg)| {
            let single_dash_long =
                arg.starts_with('-') && !arg.starts_with("--") && arg.len() > 2;
            if i > 0 && single_dash_long {
                format!("-{arg}")
            } else {
                arg
            }
        })
        .collect()
}
