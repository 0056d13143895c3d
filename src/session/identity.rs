//! Identities, user profiles, and the token-for-profile exchange.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http::{HttpTimeouts, build_http_client};

use super::SessionError;

/// Who quota is metered against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// A signed-in user.
    User {
        /// Server-assigned user id.
        id: String,
    },
    /// An anonymous install, keyed by its persisted fingerprint.
    Guest {
        /// `guest_`-prefixed fingerprint.
        fingerprint: String,
    },
}

impl Identity {
    /// True for [`Identity::User`].
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { id } => write!(f, "user:{id}"),
            Self::Guest { fingerprint } => write!(f, "guest:{fingerprint}"),
        }
    }
}

/// Profile returned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Best label for display: name, then email, then id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Exchanges an access token from the auth provider for a profile.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves `access_token` to the profile it belongs to.
    async fn exchange(&self, access_token: &str) -> Result<UserProfile, SessionError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    access_token: &'a str,
}

/// Identity exchange over HTTP: `POST {"accessToken": ...}` returning a profile.
#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpIdentityProvider {
    /// Creates a provider for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeouts, true)?,
            endpoint: endpoint.into(),
            timeout: timeouts.response,
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    #[instrument(skip(self, access_token), fields(endpoint = %self.endpoint))]
    async fn exchange(&self, access_token: &str) -> Result<UserProfile, SessionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&ExchangeRequest { access_token })
            .send()
            .await
            .map_err(|source| SessionError::ExchangeUnreachable {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::ExchangeRejected {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| SessionError::ExchangeUnreachable {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        let profile: UserProfile =
            serde_json::from_slice(&body).map_err(|source| SessionError::ExchangeInvalid {
                endpoint: self.endpoint.clone(),
                source,
            })?;
        debug!(user_id = %profile.id, "identity exchange succeeded");
        Ok(profile)
    }
}
