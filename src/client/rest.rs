use std::time::Duration;

use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{QualensError, Result};

/// Resolved credentials for one server. Username/password wins over a
/// token when both are configured; the loser is dropped so that every
/// request uses exactly one authentication mode.
#[derive(Clone, Default)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

impl Credentials {
    pub fn resolve(username: Option<&str>, password: Option<&str>, token: Option<&str>) -> Self {
        let username = non_blank(username);
        let password = non_blank(password);
        let token = non_blank(token);

        if username.is_some() && token.is_some() {
            error!(
                "Only one mode of authentication is needed. Either token or username/password. \
                 Both modes were detected. Using username/password"
            );
        }

        if username.is_some() {
            Self {
                username,
                password,
                token: None,
            }
        } else {
            Self {
                username: None,
                password: None,
                token,
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Thin GET wrapper around reqwest carrying one server's credentials.
pub struct RestClient {
    client: Client,
    credentials: Credentials,
}

impl RestClient {
    pub fn new(credentials: Credentials, read_timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("QuaLens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(read_timeout_ms))
            .build()
            .map_err(|e| QualensError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
        })
    }

    pub fn has_token(&self) -> bool {
        self.credentials.has_token()
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(username) = &self.credentials.username {
            // Basic auth over user:password
            request.basic_auth(username, self.credentials.password.as_deref())
        } else if let Some(token) = &self.credentials.token {
            // Basic auth over "token:" with an empty password slot
            request.basic_auth(token, None::<&str>)
        } else {
            request
        }
    }

    /// Issues a GET and returns the body, mapping HTTP 404 to
    /// `QualensError::NotFound`.
    pub async fn get(&self, url: &str) -> Result<String> {
        debug!("{url}");
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(QualensError::NotFound(url.to_string()));
        }
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }

    /// GET plus typed decode; a body that does not decode surfaces as the
    /// parse-error kind.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get(url).await?;
        serde_json::from_str(&body).map_err(|e| QualensError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
