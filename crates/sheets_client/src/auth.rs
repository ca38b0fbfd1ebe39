//! Bearer token sources.

use std::time::Duration;

use crate::error::{snippet, ClientError};
use crate::transport::USER_AGENT;

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Where the transport gets its bearer token, and a fresh one after a 401.
pub trait TokenSource: Send {
    fn access_token(&mut self) -> Result<String, ClientError>;
    fn refresh(&mut self) -> Result<String, ClientError>;
}

impl<T: TokenSource + ?Sized> TokenSource for Box<T> {
    fn access_token(&mut self) -> Result<String, ClientError> {
        (**self).access_token()
    }

    fn refresh(&mut self) -> Result<String, ClientError> {
        (**self).refresh()
    }
}

/// A token handed in from outside (flag or environment). Cannot be renewed.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticToken {
    fn access_token(&mut self) -> Result<String, ClientError> {
        Ok(self.token.clone())
    }

    fn refresh(&mut self) -> Result<String, ClientError> {
        Err(ClientError::Refresh {
            error: "static_token".into(),
            description: "access token was rejected and cannot be refreshed".into(),
        })
    }
}

/// OAuth2 refresh-token grant.
pub struct OAuthRefresh {
    http: reqwest::blocking::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    access_token: Option<String>,
}

impl OAuthRefresh {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self {
            http,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("refresh_token", &self.refresh_token)
            .finish()
    }
}

impl TokenSource for OAuthRefresh {
    /// The stored access token, or a freshly minted one when none was
    /// persisted with the credentials.
    fn access_token(&mut self) -> Result<String, ClientError> {
        match &self.access_token {
            Some(token) => Ok(token.clone()),
            None => self.refresh(),
        }
    }

    fn refresh(&mut self) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(&self.token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(self.form_body())
            .send()
            .map_err(|e| ClientError::Network(format!("token refresh request failed: {}", e)))?;

        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| ClientError::Body(e.to_string()))?;
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

        if status != 200 {
            let error = body["error"].as_str().unwrap_or("unknown_error").to_string();
            let description = body["error_description"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| snippet(&text));
            log::warn!("token refresh failed with HTTP {} ({})", status, error);
            return Err(ClientError::Refresh { error, description });
        }

        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| ClientError::Decode("token response missing access_token".into()))?
            .to_string();

        // Google may rotate the refresh token.
        if let Some(rotated) = body["refresh_token"].as_str() {
            self.refresh_token = rotated.to_string();
        }
        log::debug!("access token refreshed");
        self.access_token = Some(token.clone());
        Ok(token)
    }
}
