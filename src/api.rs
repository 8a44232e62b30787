// API client module: a small blocking HTTP client for the subset of the
// Matrix client-server API the CLI needs. Every non-success response is
// turned into `Error::Remote` carrying the server's errcode and message.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::Error;
use crate::message::OutgoingMessage;
use crate::sync::{RoomList, SyncResponse};

/// Sent in place of a token on calls made before login.
const DUMMY_AUTH: &str = "X-Dummy: 1";

const CLIENT_PREFIX: [&str; 3] = ["_matrix", "client", "r0"];

/// Blocking client bound to one home server, with the access token used
/// for authenticated calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

/// Password login payload for `POST /login`.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: UserIdentifier,
    pub password: String,
    pub initial_device_display_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
}

/// Fields of the login response that get persisted. `home_server` is
/// optional because newer servers no longer send it.
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub user_id: String,
    #[serde(default)]
    pub home_server: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct VersionsResponse {
    pub versions: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct SendResponse {
    event_id: String,
}

/// Standard Matrix error body.
#[derive(Deserialize, Debug)]
struct MatrixError {
    errcode: String,
    #[serde(default)]
    error: String,
}

impl LoginRequest {
    pub fn password(user: &str, password: &str, device_name: String) -> Self {
        LoginRequest {
            kind: "m.login.password".into(),
            identifier: UserIdentifier {
                kind: "m.id.user".into(),
                user: user.into(),
            },
            password: password.into(),
            initial_device_display_name: device_name,
        }
    }
}

impl ApiClient {
    /// Create a client for the server at `base_url` (scheme included).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid server address {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid server address {base_url}"));
        }
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url,
            token: None,
        })
    }

    /// Client for the home server stored at login, authenticated with its token.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        let mut api = ApiClient::new(&credentials.base_url())?;
        api.set_token(&credentials.access_token);
        Ok(api)
    }

    /// Store an access token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Authorization header: the bearer token, or a placeholder before login.
    fn auth_headers(&self) -> Result<HeaderMap, Error> {
        let token = self.token.as_deref().unwrap_or(DUMMY_AUTH);
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            Error::Usage("stored access token is not usable, please run login with --login".into())
        })?;
        value.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// `/_matrix/client/<path...>` under the base URL, each element of
    /// `path` percent-encoded as one segment.
    fn endpoint(&self, prefix: &[&str], path: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(prefix).extend(path);
        }
        url
    }

    fn get<T: DeserializeOwned>(&self, url: Url, what: &'static str) -> Result<T, Error> {
        debug!("GET {url}");
        self.execute(self.client.get(url), what)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
        what: &'static str,
    ) -> Result<T, Error> {
        debug!("POST {url}");
        self.execute(self.client.post(url).json(body), what)
    }

    fn execute<T: DeserializeOwned>(&self, req: RequestBuilder, what: &'static str) -> Result<T, Error> {
        let res = req.headers(self.auth_headers()?).send()?;
        let status = res.status();
        let body = res.text()?;
        debug!(%status, bytes = body.len(), "{what} response");
        if !status.is_success() {
            return Err(remote_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|source| Error::Decode { what, source })
    }

    /// Probe `GET /_matrix/client/versions`. Only succeeds for servers that
    /// answer with a Matrix versions document.
    pub fn versions(&self) -> Result<VersionsResponse, Error> {
        let url = self.endpoint(&["_matrix", "client", "versions"], &[]);
        self.get(url, "versions")
    }

    /// Exchange a username and password for an access token.
    pub fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let url = self.endpoint(&CLIENT_PREFIX, &["login"]);
        let resp = self.post(url, req, "login").context("Login failed")?;
        Ok(resp)
    }

    /// Full-state `GET /sync` without a filter.
    pub fn sync(&self) -> Result<SyncResponse> {
        let url = self.endpoint(&CLIENT_PREFIX, &["sync"]);
        let resp = self.get(url, "sync").context("Failed to fetch room data")?;
        Ok(resp)
    }

    /// Joined and invited rooms with their display names.
    pub fn list_rooms(&self) -> Result<RoomList> {
        Ok(self.sync()?.into())
    }

    pub fn join_room(&self, room_id: &str) -> Result<()> {
        let url = self.endpoint(&CLIENT_PREFIX, &["rooms", room_id, "join"]);
        let _: IgnoredAny = self
            .post(url, &serde_json::json!({}), "join")
            .with_context(|| format!("Failed to join room {room_id}"))?;
        Ok(())
    }

    pub fn leave_room(&self, room_id: &str) -> Result<()> {
        let url = self.endpoint(&CLIENT_PREFIX, &["rooms", room_id, "leave"]);
        let _: IgnoredAny = self
            .post(url, &serde_json::json!({}), "leave")
            .with_context(|| format!("Failed to leave room {room_id}"))?;
        Ok(())
    }

    /// Send an `m.room.message` event and return the new event's id.
    pub fn send_message(&self, room_id: &str, message: &OutgoingMessage) -> Result<String> {
        let url = self.endpoint(&CLIENT_PREFIX, &["rooms", room_id, "send", "m.room.message"]);
        debug!(
            msgtype = message.msgtype,
            body = %message.body,
            format = ?message.format,
            formatted_body = ?message.formatted_body,
            "sending message"
        );
        let resp: SendResponse = self
            .post(url, message, "send")
            .with_context(|| format!("Failed to send message to {room_id}"))?;
        debug!(event_id = %resp.event_id, "message sent");
        Ok(resp.event_id)
    }
}

/// Build `Error::Remote` from a failed response, using the Matrix error body
/// when there is one and the raw text otherwise.
fn remote_error(status: StatusCode, body: &str) -> Error {
    match serde_json::from_str::<MatrixError>(body) {
        Ok(err) => Error::Remote {
            status,
            errcode: Some(err.errcode),
            message: err.error,
        },
        Err(_) => Error::Remote {
            status,
            errcode: None,
            message: body.trim().to_string(),
        },
    }
}
