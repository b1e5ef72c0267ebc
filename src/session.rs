use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::DockerHubClient;
use crate::error::{HubError, Result};

/// Username and password provided on the command line as `user:password`
///
/// Never persisted, and the password is redacted from the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl FromStr for Credentials {
    type Err = HubError;

    /// Splits on the first `:` so that passwords may contain colons
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (username, password) = s.split_once(':').ok_or_else(|| {
            HubError::Validation("login credentials must be given as `username:password`".into())
        })?;

        if username.is_empty() || password.is_empty() {
            return Err(HubError::Validation(
                "both the username and the password must be non-empty".into(),
            ));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// An authenticated session on the Docker Hub, valid for a single invocation
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    expiry: Option<DateTime<Utc>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"***")
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl Session {
    /// Wraps a bearer token, reading its expiry when the token is a JWT
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let expiry = jwt_expiry(&token);
        Self { token, expiry }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Tokens without a known expiry are assumed to be valid
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims = serde_json::from_slice::<JwtClaims>(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp?, 0)
}

impl DockerHubClient {
    /// Logs into the Docker Hub with the provided credentials
    ///
    /// This method sends a single request to the login endpoint and returns a
    /// [`Session`] holding the bearer token the Docker Hub answered with. Rejected
    /// credentials are reported as [`HubError::Auth`], there is no retry.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(HubError::Auth(
                "both the username and the password must be non-empty".into(),
            ));
        }

        let url = self.endpoint("v2/users/login/")?;
        let request = self.request(Method::POST, url, None).json(&LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
        });

        let response = request.send().await?;
        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(HubError::Auth(format!(
                "the docker hub rejected the credentials for `{}`",
                credentials.username
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HubError::from_status(status, "login", &body));
        }

        let login = response
            .json::<LoginResponse>()
            .await
            .map_err(|e| HubError::Decode(format!("the login response has no token: {e}")))?;

        let session = Session::new(login.token);
        tracing::info!(username = %credentials.username, expiry = ?session.expiry(), "logged in");

        Ok(session)
    }
}
