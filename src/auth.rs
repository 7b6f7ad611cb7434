//! Identity provider client
//!
//! Sign-up and password sign-in yield a short-lived bearer token plus a
//! refresh token. The streaming core never touches these; the token is only
//! used to authorize group registry calls.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::constants::HTTP_TIMEOUT;
use crate::error::AuthError;

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// An authenticated session
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Deserialize)]
struct SignInResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
    #[serde(rename = "idToken")]
    id_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    #[serde(rename = "expiresIn", default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

/// Client for the identity provider
pub struct AuthClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    session: Option<AuthSession>,
}

impl AuthClient {
    /// Build a client; fails when no API key is configured
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.api_key.is_empty() {
            return Err(AuthError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            http,
            base_url: IDENTITY_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            session: None,
        })
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    /// Create a new account
    pub async fn register(&mut self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.authenticate("accounts:signUp", email, password).await
    }

    /// Sign in with email and password
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.authenticate("accounts:signInWithPassword", email, password)
            .await
    }

    /// Drop the active session
    pub fn logout(&mut self) {
        self.session = None;
    }

    /// Return a valid bearer token, refreshing once if the session expired
    pub async fn require_token(&mut self) -> Result<String, AuthError> {
        match &self.session {
            None => return Err(AuthError::NoSession),
            Some(session) if session.is_expired() => self.refresh().await?,
            Some(_) => {}
        }

        self.session
            .as_ref()
            .map(|session| session.id_token.clone())
            .ok_or(AuthError::NoSession)
    }

    async fn authenticate(
        &mut self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let url = format!("{}/{}?key={}", self.base_url, endpoint, self.api_key);
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self.http.post(&url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(extract_error(response).await));
        }

        let data: SignInResponse = response.json().await?;
        let session = AuthSession {
            user_id: data.local_id,
            email: data.email,
            id_token: data.id_token,
            refresh_token: data.refresh_token,
            expires_at: Utc::now() + Duration::seconds(parse_expiry(data.expires_in.as_deref())),
        };
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn refresh(&mut self) -> Result<(), AuthError> {
        let session = self.session.as_mut().ok_or(AuthError::NoSession)?;

        let url = format!("{}?key={}", self.token_url, self.api_key);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AuthError::Rejected(extract_error(response).await));
        }

        let data: RefreshResponse = response.json().await?;
        session.id_token = data.id_token;
        if let Some(refresh_token) = data.refresh_token {
            session.refresh_token = refresh_token;
        }
        session.expires_at = Utc::now() + Duration::seconds(parse_expiry(data.expires_in.as_deref()));
        Ok(())
    }
}

fn parse_expiry(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(3600)
}

/// Unwrap the provider's error body to its message when it is JSON
async fn extract_error(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_construction_error() {
        let result = AuthClient::new(&AuthConfig::default());
        assert!(matches!(result, Err(AuthError::MissingApiKey)));
    }

    #[test]
    fn session_expiry_is_inclusive_of_now() {
        let session = AuthSession {
            user_id: "u".into(),
            email: "u@example.org".into(),
            id_token: "t".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        assert!(session.is_expired());

        let fresh = AuthSession {
            expires_at: Utc::now() + Duration::seconds(3600),
            ..session
        };
        assert!(!fresh.is_expired());
    }

    #[tokio::test]
    async fn require_token_without_session_fails() {
        let mut client = AuthClient::new(&AuthConfig {
            api_key: "test-key".into(),
        })
        .unwrap();
        assert!(matches!(
            client.require_token().await,
            Err(AuthError::NoSession)
        ));
    }

    #[test]
    fn expiry_parsing_defaults_to_an_hour() {
        assert_eq!(parse_expiry(Some("120")), 120);
        assert_eq!(parse_expiry(Some("bogus")), 3600);
        assert_eq!(parse_expiry(None), 3600);
    }
}
