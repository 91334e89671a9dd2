//! Session configuration.

use serde::{Deserialize, Serialize};
use std::env;
use trackwire_types::{Error, Result};

/// Environment variable holding the server URL.
pub const SERVER_URL_VAR: &str = "TRACKWIRE_SERVER";
/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "TRACKWIRE_API_KEY";
/// Environment variable holding the API user.
pub const API_USER_VAR: &str = "TRACKWIRE_API_USER";

/// Connection and behaviour settings for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the server, without the `/api` suffix.
    pub server_url: String,
    pub api_key: String,
    pub api_user: String,
    /// Fetch unset attribute values from the server on read.
    pub auto_populate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            api_key: String::new(),
            api_user: String::new(),
            auto_populate: true,
        }
    }
}

impl SessionConfig {
    pub fn new(
        server_url: impl Into<String>,
        api_key: impl Into<String>,
        api_user: impl Into<String>,
    ) -> Self {
        Self {
            server_url: normalize_url(server_url.into()),
            api_key: api_key.into(),
            api_user: api_user.into(),
            ..Default::default()
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// The API user falls back to the login name (`USER`, then `USERNAME`)
    /// when `TRACKWIRE_API_USER` is not set.
    pub fn from_env() -> Result<Self> {
        let server_url = require_var(SERVER_URL_VAR)?;
        let api_key = require_var(API_KEY_VAR)?;
        let api_user = env::var(API_USER_VAR)
            .or_else(|_| env::var("USER"))
            .or_else(|_| env::var("USERNAME"))
            .map_err(|_| missing(API_USER_VAR))?;

        Ok(Self::new(server_url, api_key, api_user))
    }

    #[must_use]
    pub fn with_auto_populate(mut self, auto_populate: bool) -> Self {
        self.auto_populate = auto_populate;
        self
    }

    /// Checks that everything needed to reach the server is present.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(missing(SERVER_URL_VAR));
        }
        if self.api_key.is_empty() {
            return Err(missing(API_KEY_VAR));
        }
        if self.api_user.is_empty() {
            return Err(missing(API_USER_VAR));
        }
        Ok(())
    }

    /// Endpoint all batches are posted to.
    pub fn api_url(&self) -> String {
        format!("{}/api", self.server_url)
    }
}

fn require_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(missing(name)),
    }
}

fn missing(name: &str) -> Error {
    Error::Configuration(format!("{name} is not set"))
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
