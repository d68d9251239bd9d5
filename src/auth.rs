//! Session credentials and live-endpoint routing.
//!
//! A short-lived credential is fetched from an external token endpoint at
//! connect time (`GET {base}/auth/token`). The shape of the credential alone
//! decides which upstream endpoint family the duplex connection targets:
//!
//! - API-key credentials route to the direct Google AI Studio endpoint with a
//!   `key` query parameter.
//! - Bearer credentials carrying project routing hints route to the
//!   project-scoped Vertex endpoint with an `access_token` query parameter.
//!
//! Credentials live for exactly one session and are never persisted.

use serde::Deserialize;
use url::Url;

use crate::error::{SessionError, SessionResult};

/// Direct (API-key) live streaming endpoint.
pub const STUDIO_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Project-scoped live streaming endpoint for a given location.
pub fn vertex_live_endpoint(location: &str) -> String {
    format!(
        "wss://{location}-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1beta1.LlmBidiService.BidiGenerateContent"
    )
}

/// Credential type returned by the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Google AI Studio API key
    ApiKey,
    /// OAuth bearer token (service-account derived)
    Bearer,
}

/// Project routing hints accompanying bearer credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingHints {
    /// Cloud project the token is scoped to
    pub project_id: String,
    /// Region hosting the live endpoint
    pub location: String,
}

/// A short-lived credential for one live session.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    /// The token value, sent as a query parameter on the WebSocket URL
    pub token: String,
    /// Credential type, drives endpoint routing
    pub token_type: TokenType,
    /// Routing hints, present for project-scoped bearer tokens
    pub routing: Option<RoutingHints>,
}

/// Raw response shape of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "type")]
    token_type: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TryFrom<TokenResponse> for SessionCredential {
    type Error = SessionError;

    fn try_from(raw: TokenResponse) -> SessionResult<Self> {
        let token = match raw.token {
            Some(t) if !t.is_empty() => t,
            _ => {
                let detail = raw
                    .error
                    .unwrap_or_else(|| "credential endpoint returned no token".to_string());
                return Err(SessionError::Auth(detail));
            }
        };

        let token_type = match raw.token_type.as_deref() {
            Some("bearer") => TokenType::Bearer,
            _ => TokenType::ApiKey,
        };

        let routing = match (raw.project_id, raw.location) {
            (Some(project_id), Some(location)) => Some(RoutingHints {
                project_id,
                location,
            }),
            _ => None,
        };

        Ok(SessionCredential {
            token,
            token_type,
            routing,
        })
    }
}

impl SessionCredential {
    /// Query parameter name carrying the token on the WebSocket URL.
    pub fn auth_query_param(&self) -> &'static str {
        match self.token_type {
            TokenType::ApiKey => "key",
            TokenType::Bearer => "access_token",
        }
    }

    /// Build the authorized WebSocket URL for this credential.
    ///
    /// Routing is a pure function of credential shape. A bearer token without
    /// routing hints falls back to the direct endpoint with the bearer query
    /// parameter. A future third credential shape must extend this match.
    pub fn websocket_url(&self, override_base: Option<&str>) -> SessionResult<Url> {
        let base = match override_base {
            Some(b) => b.to_string(),
            None => match (self.token_type, &self.routing) {
                (TokenType::Bearer, Some(hints)) => vertex_live_endpoint(&hints.location),
                _ => STUDIO_LIVE_ENDPOINT.to_string(),
            },
        };

        let mut url =
            Url::parse(&base).map_err(|e| SessionError::Transport(format!("bad endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair(self.auth_query_param(), &self.token);
        Ok(url)
    }
}

/// Fetch a session credential from the token endpoint.
///
/// Absence of a token is a hard failure (`SessionError::Auth`).
pub async fn fetch_credential(
    http: &reqwest::Client,
    base_url: &str,
) -> SessionResult<SessionCredential> {
    let url = format!("{}/auth/token", base_url.trim_end_matches('/'));
    tracing::debug!("Fetching session credential from {url}");

    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| SessionError::Auth(format!("credential fetch failed: {e}")))?;

    let raw: TokenResponse = response
        .json()
        .await
        .map_err(|e| SessionError::Auth(format!("credential response invalid: {e}")))?;

    SessionCredential::try_from(raw)
}
