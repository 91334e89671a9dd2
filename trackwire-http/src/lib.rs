//! Blocking HTTP transport for trackwire sessions.
//!
//! Every batch is posted as JSON to `<server>/api` with the API key and user
//! in request headers. Non-200 responses are mapped onto the error taxonomy:
//!
//! | status            | error                                   |
//! |-------------------|-----------------------------------------|
//! | 401, 403          | [`Error::Authentication`]               |
//! | 402               | [`Error::Server`] with a license message |
//! | body says the API is disabled | [`Error::Server`] asking to enable it |
//! | 500               | [`Error::Server`] with the response text |
//! | anything else     | [`Error::Server`] with a generic message |
//!
//! Connection failures are [`Error::Transport`]. Nothing is retried.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Instant;
use tracing::debug;
use trackwire_session::{SessionConfig, Transport};
use trackwire_types::{Error, Result};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "trackwire-api-key";
/// Header carrying the API user.
pub const API_USER_HEADER: &str = "trackwire-user";

const LICENSE_MESSAGE: &str =
    "Server reported a license error. Please check your server license is valid and try again.";
const API_DISABLED_MARKER: &str = "API is disabled";
const API_DISABLED_MESSAGE: &str =
    "The API is disabled on the server. Please ask your system administrator to enable it.";
const GENERIC_MESSAGE: &str = "Unanticipated server error occurred.";

/// A [`Transport`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    api_user: String,
}

impl HttpTransport {
    /// Creates a transport for the server described by `config`.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(config, client)
    }

    /// Creates a transport reusing an existing client.
    pub fn with_client(config: &SessionConfig, client: Client) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            endpoint: config.api_url(),
            api_key: config.api_key.clone(),
            api_user: config.api_user.clone(),
        })
    }

    /// URL batches are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    fn call(&self, batch: &serde_json::Value) -> Result<serde_json::Value> {
        debug!(endpoint = %self.endpoint, "Posting batch");
        let started = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_USER_HEADER, &self.api_user)
            .json(batch)
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Server responded"
        );

        if status != StatusCode::OK {
            return Err(error_for_status(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Maps a non-200 response onto an error.
pub fn error_for_status(status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::Authentication(format!(
            "server rejected the API credentials ({status})"
        )),
        402 => Error::Server(LICENSE_MESSAGE.to_string()),
        _ if body.contains(API_DISABLED_MARKER) => Error::Server(API_DISABLED_MESSAGE.to_string()),
        500 => Error::Server(body.to_string()),
        _ => Error::Server(GENERIC_MESSAGE.to_string()),
    }
}
