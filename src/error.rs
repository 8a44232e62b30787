// Error taxonomy for the CLI. Every failure terminates the process; the
// variant decides which exit status the binary reports.

use std::path::PathBuf;

use reqwest::StatusCode;

/// Failures the CLI distinguishes when choosing an exit status.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required flag or argument is missing. Detected before any request.
    #[error("{0}")]
    Usage(String),

    #[error("credentials cannot be found at {}, please run login with --login", path.display())]
    NotLoggedIn { path: PathBuf },

    #[error("credentials file {} is corrupt", path.display())]
    CorruptCredentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{url} is not a recognized matrix server: {reason}")]
    NotAMatrixServer { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("{}", remote_message(*status, errcode.as_deref(), message))]
    Remote {
        status: StatusCode,
        errcode: Option<String>,
        message: String,
    },

    #[error("could not reach the server")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected {what} response from the server")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Exit status for this failure: 2 for errors reported by the server,
    /// 1 for everything local (usage, credentials, network, decoding).
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Remote { .. } => 2,
            _ => 1,
        }
    }
}

/// Exit status for an error chain produced by one of the operations.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(1, Error::exit_code)
}

fn remote_message(status: StatusCode, errcode: Option<&str>, message: &str) -> String {
    match errcode {
        Some(code) => format!("error: {message} ({code})"),
        None if message.is_empty() => format!("error: server responded with {status}"),
        None => format!("error: server responded with {status}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn remote_errors_exit_with_two() {
        let err = Error::Remote {
            status: StatusCode::FORBIDDEN,
            errcode: Some("M_FORBIDDEN".into()),
            message: "Invalid password".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "error: Invalid password (M_FORBIDDEN)");
    }

    #[test]
    fn exit_code_survives_context() {
        let err: anyhow::Result<()> = Err(Error::Remote {
            status: StatusCode::UNAUTHORIZED,
            errcode: None,
            message: String::new(),
        })
        .context("Failed to list rooms");
        assert_eq!(exit_code(&err.unwrap_err()), 2);

        let err = anyhow::Error::new(Error::Usage("room id is required".into()));
        assert_eq!(exit_code(&err), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("something else")), 1);
    }

    #[test]
    fn remote_without_matrix_body_shows_status() {
        let err = Error::Remote {
            status: StatusCode::BAD_GATEWAY,
            errcode: None,
            message: "upstream down".into(),
        };
        assert_eq!(err.to_string(), "error: server responded with 502 Bad Gateway: upstream down");
    }
}
