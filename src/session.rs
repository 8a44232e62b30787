// Session operations that combine the API client with the credential store:
// logging in, and reopening an authenticated client from stored credentials.

use std::path::PathBuf;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::api::{ApiClient, LoginRequest};
use crate::credentials::{self, Credentials};
use crate::error::Error;

/// Per-invocation settings, passed explicitly to the operations.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials_path: PathBuf,
    pub debug: bool,
}

impl Config {
    pub fn new(debug: bool) -> Self {
        Config {
            credentials_path: credentials::default_path(),
            debug,
        }
    }

    /// Log to stderr. `RUST_LOG` wins; otherwise warnings only, or debug
    /// output for this crate with `--debug`.
    pub fn init_logging(&self) {
        let default = if self.debug { "warn,gatrix=debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Authenticated client for the stored credentials.
    pub fn connect(&self) -> Result<ApiClient> {
        let credentials = credentials::load(&self.credentials_path)?;
        debug!(user_id = %credentials.user_id, home_server = %credentials.home_server, "loaded credentials");
        ApiClient::from_credentials(&credentials)
    }
}

/// `<user>@<host> using gatrix`, shown to the user in their device list.
pub fn device_display_name() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();
    let host = gethostname::gethostname();
    format!("{}@{} using gatrix", user, host.to_string_lossy())
}

/// Client for the server at `server_url` (already normalized), after
/// checking that it answers the Matrix versions endpoint.
pub fn probe_server(server_url: &str) -> Result<ApiClient> {
    let api = ApiClient::new(server_url)?;
    let versions = api.versions().map_err(|e| Error::NotAMatrixServer {
        url: server_url.to_string(),
        reason: format!("{:#}", anyhow::Error::new(e)),
    })?;
    debug!(versions = ?versions.versions, "server supports");
    Ok(api)
}

/// Log in with a password and persist the returned credentials. Nothing is
/// written unless the server accepted the login.
pub fn authenticate(config: &Config, api: &ApiClient, username: &str, password: &str) -> Result<Credentials> {
    let req = LoginRequest::password(username, password, device_display_name());
    let resp = api.login(&req)?;
    debug!(user_id = %resp.user_id, device_id = ?resp.device_id, "logged in");

    let home_server = match resp.home_server {
        Some(home_server) => home_server,
        None => server_host(api.base_url()),
    };
    let credentials = Credentials {
        home_server,
        user_id: resp.user_id,
        access_token: resp.access_token,
    };
    credentials::save(&config.credentials_path, &credentials).with_context(|| {
        format!("Failed to save credentials to {}", config.credentials_path.display())
    })?;
    info!(user_id = %credentials.user_id, "credentials saved");
    Ok(credentials)
}

fn server_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
