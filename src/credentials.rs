// Credential store: the single JSON file holding the home server, user id
// and access token obtained at login.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// Environment variable overriding the credentials file location.
pub const CREDENTIALS_ENV: &str = "GATRIX_CREDENTIALS";

/// What login leaves behind for later invocations. Always written whole.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub home_server: String,
    pub user_id: String,
    pub access_token: String,
}

impl Credentials {
    /// Base URL for authenticated requests against the stored home server.
    pub fn base_url(&self) -> String {
        normalize_server_address(&self.home_server)
    }
}

/// Location of the credentials file: `$GATRIX_CREDENTIALS`, or
/// `~/.config/gatrix` in the user's home directory.
pub fn default_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CREDENTIALS_ENV) {
        return PathBuf::from(path);
    }
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(".config").join("gatrix")
}

/// Prefix `https://` and strip a trailing slash, so that `matrix.org/`,
/// `https://matrix.org` and `http://matrix.org/` all become
/// `https://matrix.org`.
pub fn normalize_server_address(address: &str) -> String {
    let address = address.trim();
    let host = address
        .strip_prefix("https://")
        .or_else(|| address.strip_prefix("http://"))
        .unwrap_or(address);
    format!("https://{}", host.trim_end_matches('/'))
}

/// Read the credentials file. A missing file means the user never logged in;
/// a file that does not parse is reported as corrupt.
pub fn load(path: &Path) -> Result<Credentials, Error> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::NotLoggedIn { path: path.to_path_buf() });
        }
        Err(e) => return Err(Error::Io(e)),
    };
    serde_json::from_slice(&data).map_err(|source| Error::CorruptCredentials {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the credentials file, replacing any previous content. The file is
/// restricted to owner read/write before the token is written to it.
pub fn save(path: &Path, credentials: &Credentials) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec(credentials).map_err(std::io::Error::from)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies to newly created files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(&json)?;
    file.sync_all()?;
    debug!(path = %path.display(), user_id = %credentials.user_id, "saved credentials");
    Ok(())
}
