//! Google identity-provider adapter.
//!
//! Implements the authorization-code flow against Google's OAuth 2.0
//! endpoints: build the consent URL, exchange the code for an access token,
//! then fetch the userinfo profile. The rest of the application only sees
//! the verified [`FederatedIdentity`] assertion.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::domain::ports::{FederatedIdentity, IdentityProvider, IdentityProviderError};

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// OAuth client configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl GoogleConfig {
    /// Read `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, and
    /// `GOOGLE_REDIRECT_URI`. Returns `None` when the provider is not
    /// configured, which disables the OAuth endpoints.
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI").ok()?;
        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

/// Token endpoint response; only the access token is consumed.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Userinfo response from `googleapis.com/oauth2/v2/userinfo`.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Google-backed implementation of the identity provider port.
#[derive(Clone)]
pub struct GoogleIdentityProvider {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleIdentityProvider {
    /// Create a provider from configuration.
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str) -> String {
        // AUTH_ENDPOINT is a constant; parsing cannot fail at runtime.
        let mut url = Url::parse(AUTH_ENDPOINT).unwrap_or_else(|_| {
            unreachable!("authorization endpoint constant is a valid URL")
        });
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state);
        url.into()
    }

    async fn resolve_code(&self, code: &str) -> Result<FederatedIdentity, IdentityProviderError> {
        let token: TokenResponse = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|err| IdentityProviderError::exchange(err.to_string()))?
            .error_for_status()
            .map_err(|err| IdentityProviderError::exchange(err.to_string()))?
            .json()
            .await
            .map_err(|err| IdentityProviderError::exchange(err.to_string()))?;

        let profile: GoogleUser = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|err| IdentityProviderError::exchange(err.to_string()))?
            .error_for_status()
            .map_err(|err| IdentityProviderError::exchange(err.to_string()))?
            .json()
            .await
            .map_err(|err| IdentityProviderError::exchange(err.to_string()))?;

        let email = profile
            .email
            .filter(|email| !email.is_empty())
            .ok_or(IdentityProviderError::MissingFields)?;
        if profile.id.is_empty() {
            return Err(IdentityProviderError::MissingFields);
        }

        Ok(FederatedIdentity {
            subject: profile.id,
            email,
            display_name: profile.name,
            picture_url: profile.picture,
        })
    }
}
